//! Relay - 転送して記録するアプリケーションサービス
//!
//! descriptor → Forwarder::execute → HistoryEntry::complete → HistoryStore::add
//!
//! Relay 自体は状態を持たず、注入された store / forwarder / clock を
//! つなぐだけです。HTTP 層はこの型だけを見ます。

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{
    CallDescriptor, CallResult, ErrorKind, ForwardError, HistoryEntry, HistoryId, HistoryRecord,
    Page, StoreError,
};
use crate::ports::{Clock, Forwarder, HistoryStore};

/// Errors surfaced by the relay to the endpoint layer.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Input that never reached the core (malformed JSON, malformed id, ...).
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Forward(#[from] ForwardError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::BadRequest(_) => ErrorKind::Client,
            RelayError::Forward(e) => e.kind(),
            RelayError::Store(e) => e.kind(),
        }
    }
}

/// Relay は Forwarder・Clock・HistoryStore を束ねる
pub struct Relay {
    store: Arc<dyn HistoryStore>,
    forwarder: Arc<dyn Forwarder>,
    clock: Arc<dyn Clock>,
}

impl Relay {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        forwarder: Arc<dyn Forwarder>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            forwarder,
            clock,
        }
    }

    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        &self.store
    }

    /// Execute the call, stamp it on completion and record it.
    ///
    /// Failed forwards are not recorded.
    pub async fn forward_and_record(
        &self,
        descriptor: CallDescriptor,
    ) -> Result<(HistoryId, CallResult), RelayError> {
        info!(method = %descriptor.method, url = %descriptor.url, "got request");

        let result = match self.forwarder.execute(&descriptor).await {
            Ok(result) => result,
            Err(err) => {
                warn!(url = %descriptor.url, error = %err, "forward failed");
                return Err(err.into());
            }
        };

        let entry = HistoryEntry::complete(descriptor, result.clone(), self.clock.as_ref());
        let id = self.store.add(entry).await?;
        info!(%id, status = result.status, content_length = result.content_length, "call recorded");
        Ok((id, result))
    }

    pub async fn delete(&self, id: HistoryId) -> Result<(), RelayError> {
        info!(%id, "delete operation requested");
        self.store.delete(id).await?;
        Ok(())
    }

    pub async fn history(&self, page: Page) -> Result<Vec<HistoryRecord>, RelayError> {
        Ok(self.store.history(page).await?)
    }

    /// Release the store. Further calls fail with `StoreClosed`.
    pub async fn shutdown(&self) -> Result<(), RelayError> {
        self.store.close().await?;
        Ok(())
    }
}
