//! Ports - 抽象化レイヤー
//!
//! 外部システム（上流 HTTP サービス、データベース、時刻）への
//! インターフェースを trait として定義し、実装の詳細を隠蔽します。

pub mod clock;
pub mod forwarder;
pub mod history_store;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::forwarder::Forwarder;
pub use self::history_store::HistoryStore;
