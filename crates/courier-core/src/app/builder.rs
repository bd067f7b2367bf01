//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）：DB に繋がらなければ起動しない
//! - バックエンドの選択は構築時に一度だけ

use std::sync::Arc;

use tracing::info;

use super::relay::Relay;
use crate::config::{BackendConfig, ForwarderConfig};
use crate::domain::{ForwardError, StoreError};
use crate::impls::{HttpForwarder, InMemoryHistoryStore, SqliteHistoryStore};
use crate::ports::{Clock, Forwarder, HistoryStore, SystemClock};

/// AppBuilder は Relay を構築
///
/// # 使用例
/// ```ignore
/// let relay = AppBuilder::new()
///     .backend(BackendConfig::Sqlite(SqliteConfig::new("sqlite://courier.db")))
///     .forwarder_config(ForwarderConfig::default())
///     .build()
///     .await?;
/// ```
///
/// テストでは `with_store` / `with_forwarder` / `with_clock` で差し替えます。
pub struct AppBuilder {
    backend: BackendConfig,
    forwarder_config: ForwarderConfig,
    store: Option<Arc<dyn HistoryStore>>,
    forwarder: Option<Arc<dyn Forwarder>>,
    clock: Option<Arc<dyn Clock>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("failed to open history store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to build forwarder: {0}")]
    Forwarder(#[from] ForwardError),
}

impl AppBuilder {
    /// 新しい AppBuilder を作成（InMemory バックエンド、タイムアウトなし）
    pub fn new() -> Self {
        Self {
            backend: BackendConfig::default(),
            forwarder_config: ForwarderConfig::default(),
            store: None,
            forwarder: None,
            clock: None,
        }
    }

    pub fn backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn forwarder_config(mut self, config: ForwarderConfig) -> Self {
        self.forwarder_config = config;
        self
    }

    /// Use this store instead of building one from `backend`.
    pub fn with_store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_forwarder(mut self, forwarder: Arc<dyn Forwarder>) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Open the store and assemble a `Relay`.
    pub async fn build(self) -> Result<Relay, BuildError> {
        let store = match self.store {
            Some(store) => store,
            None => open_store(&self.backend).await?,
        };
        let forwarder: Arc<dyn Forwarder> = match self.forwarder {
            Some(forwarder) => forwarder,
            None => Arc::new(HttpForwarder::new(&self.forwarder_config)?),
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        info!(records = store.len().await?, "history store opened");
        Ok(Relay::new(store, forwarder, clock))
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn open_store(backend: &BackendConfig) -> Result<Arc<dyn HistoryStore>, StoreError> {
    match backend {
        BackendConfig::Memory => {
            info!("using in-memory history store");
            Ok(Arc::new(InMemoryHistoryStore::new()))
        }
        BackendConfig::Sqlite(config) => {
            info!(url = %config.url, "using sqlite history store");
            Ok(Arc::new(SqliteHistoryStore::connect(config).await?))
        }
    }
}
