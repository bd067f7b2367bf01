//! InMemoryHistoryStore - プロセス内の履歴ストア
//!
//! # 学習ポイント
//! - ID 採番（AtomicI64）をロックから切り離す
//! - 書き込みは排他ロック、読み出しは共有ロックでスナップショットだけ取る
//! - 並び替え・切り出しはロックを外してから行う

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{HistoryEntry, HistoryId, HistoryRecord, Page, StoreError};
use crate::ports::HistoryStore;

/// InMemoryHistoryStore は HashMap ベースの履歴ストア
///
/// # 実装詳細
/// - `last_id` はロックと独立したカウンタ。採番は競合しない
/// - そのため ID の順序は「到着順」ではなく「完了して add された順」になる
/// - 削除は即時（tombstone なし）
pub struct InMemoryHistoryStore {
    last_id: AtomicI64,
    entries: RwLock<HashMap<HistoryId, HistoryEntry>>,
    closed: AtomicBool,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            last_id: AtomicI64::new(0),
            entries: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::StoreClosed);
        }
        Ok(())
    }

    /// Copy every entry out under the shared lock.
    async fn snapshot(&self) -> Vec<HistoryRecord> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .map(|(id, entry)| HistoryRecord::new(*id, entry.clone()))
            .collect()
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn add(&self, entry: HistoryEntry) -> Result<HistoryId, StoreError> {
        self.ensure_open()?;
        let id = HistoryId::new(self.last_id.fetch_add(1, Ordering::SeqCst) + 1);

        let mut entries = self.entries.write().await;
        // close() は closed を立ててから同じロックで clear する
        self.ensure_open()?;
        entries.insert(id, entry);
        drop(entries);
        debug!(%id, "history record added");
        Ok(id)
    }

    async fn delete(&self, id: HistoryId) -> Result<(), StoreError> {
        self.ensure_open()?;
        let removed = self.entries.write().await.remove(&id);
        debug!(%id, existed = removed.is_some(), "history record deleted");
        Ok(())
    }

    async fn history(&self, page: Page) -> Result<Vec<HistoryRecord>, StoreError> {
        self.ensure_open()?;
        // ロックはスナップショット取得の間だけ
        let snapshot = self.snapshot().await;
        page.apply(snapshot)
    }

    async fn len(&self) -> Result<usize, StoreError> {
        self.ensure_open()?;
        Ok(self.entries.read().await.len())
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.entries.write().await.clear();
        debug!("in-memory history store closed");
        Ok(())
    }
}
