//! Forwarder port - 外部 HTTP 呼び出しの抽象化
//!
//! 本番では `HttpForwarder`（reqwest）を使います。
//! テストでは trait を差し替えてネットワークなしで Relay を検証できます。

use async_trait::async_trait;

use crate::domain::{CallDescriptor, CallResult, ForwardError};

/// Forwarder は CallDescriptor を実際の呼び出しに変換して実行する
///
/// # 契約
/// - 未対応メソッド・POST の空ボディはネットワークに触れる前に失敗する
/// - 上流が 2xx 以外を返してもエラーではない（そのステータスを結果に入れる）
/// - レスポンスボディは最後まで読み、実際のサイズを `content_length` にする
/// - ストアのロックは一切持たない
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn execute(&self, descriptor: &CallDescriptor) -> Result<CallResult, ForwardError>;
}
