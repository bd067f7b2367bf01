//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: 設定からバックエンドを選び、Relay を組み立てる
//! - **Relay**: 転送 → 完了時刻の付与 → 履歴への追加
//! - **routes**: axum による HTTP 表面

pub mod builder;
pub mod relay;
pub mod routes;

// 主要な型を再エクスポート
pub use self::builder::{AppBuilder, BuildError};
pub use self::relay::{Relay, RelayError};
pub use self::routes::{router, serve};
