//! HistoryStore port - 呼び出し履歴の正本
//!
//! # 実装
//! - **InMemoryHistoryStore**: プロセス内のみ（再起動で消える）
//! - **SqliteHistoryStore**: リレーショナル（永続）
//!
//! どちらを使うかは構築時（`AppBuilder`）に一度だけ決めます。
//! 呼び出し側でバックエンドを分岐してはいけません。

use async_trait::async_trait;

use crate::domain::{HistoryEntry, HistoryId, HistoryRecord, Page, StoreError};

/// HistoryStore は履歴の追加・削除・ページ取得を提供
///
/// # 契約
/// - `add` は次の ID を割り当てて返す。ID は増加し続け、削除後も再利用しない
/// - `delete` は存在しない ID でもエラーにしない（冪等）
/// - `history` は取得時点のスナップショットを完了時刻順（同時刻は ID 順）で返す
/// - `close` 後はすべての操作が `StoreError::StoreClosed` を返す
///
/// # Thread Safety
/// - `Send + Sync` を要求（全リクエストで共有される）
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Insert a finished call and return its new identifier.
    async fn add(&self, entry: HistoryEntry) -> Result<HistoryId, StoreError>;

    /// Remove a record. Absent ids are a no-op.
    async fn delete(&self, id: HistoryId) -> Result<(), StoreError>;

    /// Ordered, bounded slice of the current history.
    async fn history(&self, page: Page) -> Result<Vec<HistoryRecord>, StoreError>;

    /// Number of records currently stored.
    async fn len(&self) -> Result<usize, StoreError>;

    /// Release the backend. Idempotent.
    async fn close(&self) -> Result<(), StoreError>;
}
