//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryHistoryStore**: プロセス内の履歴（再起動で消える）
//! - **SqliteHistoryStore**: SQLite による永続履歴
//! - **HttpForwarder**: reqwest による外部呼び出し
//! - **RetryPolicy**: SQLite 書き込みの有限リトライ

pub mod http_forwarder;
pub mod inmem_store;
pub mod retry;
pub mod sqlite_store;

// 主要な型を再エクスポート
pub use self::http_forwarder::HttpForwarder;
pub use self::inmem_store::InMemoryHistoryStore;
pub use self::retry::RetryPolicy;
pub use self::sqlite_store::SqliteHistoryStore;
