//! Errors - エラー型と分類
//!
//! すべてのエラーは値として返します（プロセスを落とさない）。
//! 境界（HTTP 層）で `ErrorKind` を見てレスポンスに変換します。

/// ErrorKind はエラーの運用分類
///
/// - Client: 呼び出し側の入力が不正（4xx 相当）
/// - Upstream: 外部サービスへの呼び出しが失敗（5xx 相当、自動リトライしない）
/// - Storage: 永続化バックエンドの障害
/// - Closed: Store がすでに閉じられている
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Client,
    Upstream,
    Storage,
    Closed,
}

/// Failures of the request forwarder.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("HTTP method not in list of supported: GET, POST (got {0:?})")]
    UnsupportedMethod(String),

    #[error("no body specified for POST request")]
    MissingBody,

    #[error("invalid outbound request: {0}")]
    InvalidRequest(String),

    #[error("upstream {url} unavailable: {reason}")]
    UpstreamUnavailable { url: String, reason: String },

    #[error("failed to read upstream response body: {0}")]
    ResponseBody(String),
}

impl ForwardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForwardError::UnsupportedMethod(_)
            | ForwardError::MissingBody
            | ForwardError::InvalidRequest(_) => ErrorKind::Client,
            ForwardError::UpstreamUnavailable { .. } | ForwardError::ResponseBody(_) => {
                ErrorKind::Upstream
            }
        }
    }
}

/// Failures of a history store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("offset {offset} greater than size of history {size}")]
    OffsetOutOfRange { offset: usize, size: usize },

    #[error("storage fault: {0}")]
    StorageFault(String),

    #[error("history store is closed")]
    StoreClosed,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::OffsetOutOfRange { .. } => ErrorKind::Client,
            StoreError::StorageFault(_) => ErrorKind::Storage,
            StoreError::StoreClosed => ErrorKind::Closed,
        }
    }
}
