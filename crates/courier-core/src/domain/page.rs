//! Page - 履歴の並び順とページング
//!
//! 両バックエンド（InMemory / SQLite）が共有するアルゴリズムです。
//! バックエンドはスナップショット（`Vec<HistoryRecord>`）を作るだけで、
//! 並び替えと切り出しはここで行います。
//!
//! # 並び順
//! - 完了時刻の昇順
//! - 同時刻の場合は ID の昇順（安定ソート + タイブレーク）

use super::errors::StoreError;
use super::record::HistoryRecord;

/// Offset/limit window over the ordered history.
///
/// `limit == 0` means "everything from `offset` to the end".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// The whole history.
    pub fn all() -> Self {
        Self::default()
    }

    /// Sort a snapshot and cut this page out of it.
    pub fn apply(&self, mut snapshot: Vec<HistoryRecord>) -> Result<Vec<HistoryRecord>, StoreError> {
        let size = snapshot.len();
        if self.offset > size {
            return Err(StoreError::OffsetOutOfRange {
                offset: self.offset,
                size,
            });
        }

        sort_by_completion(&mut snapshot);

        let end = if self.limit == 0 {
            size
        } else {
            self.offset.saturating_add(self.limit).min(size)
        };

        Ok(snapshot.drain(self.offset..end).collect())
    }
}

/// Completion time ascending, identifier ascending on ties.
pub fn sort_by_completion(records: &mut [HistoryRecord]) {
    records.sort_by(|a, b| a.time().cmp(&b.time()).then_with(|| a.id.cmp(&b.id)));
}
