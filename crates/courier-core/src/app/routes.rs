//! Axum HTTP surface.
//!
//! - `POST /` forward a JSON call descriptor and record it
//! - `DELETE /?id=<int>` delete a record
//! - `GET /history?offset=<int>&limit=<int>` ordered history page

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use super::relay::{Relay, RelayError};
use crate::domain::{CallDescriptor, ErrorKind, ForwardError, HistoryId, Page};

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match (&self, self.kind()) {
            (_, ErrorKind::Client) => StatusCode::BAD_REQUEST,
            (RelayError::Forward(ForwardError::ResponseBody(_)), _) => StatusCode::BAD_GATEWAY,
            (_, ErrorKind::Upstream) => StatusCode::SERVICE_UNAVAILABLE,
            (_, ErrorKind::Storage) => StatusCode::INTERNAL_SERVER_ERROR,
            (_, ErrorKind::Closed) => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}

/// Build the router around a shared relay.
pub fn router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/", post(forward_handler).delete(delete_handler))
        .route("/history", get(history_handler))
        .with_state(relay)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, relay: Arc<Relay>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "starting server");
    }
    axum::serve(listener, router(relay))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn forward_handler(
    State(relay): State<Arc<Relay>>,
    body: Bytes,
) -> Result<impl IntoResponse, RelayError> {
    // Content-Type は見ない（JSON として読めればよい）
    let descriptor: CallDescriptor = serde_json::from_slice(&body)
        .map_err(|e| RelayError::BadRequest(format!("malformed call descriptor: {e}")))?;
    let (_, result) = relay.forward_and_record(descriptor).await?;
    Ok(Json(result))
}

async fn delete_handler(
    State(relay): State<Arc<Relay>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<StatusCode, RelayError> {
    let raw = params.get("id").map(String::as_str).unwrap_or_default();
    let id = raw
        .parse::<i64>()
        .map_err(|e| RelayError::BadRequest(format!("malformed id {raw:?}: {e}")))?;
    relay.delete(HistoryId::new(id)).await?;
    Ok(StatusCode::OK)
}

async fn history_handler(
    State(relay): State<Arc<Relay>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, RelayError> {
    let offset = parse_count(&params, "offset")?;
    let limit = parse_count(&params, "limit")?;
    let records = relay.history(Page::new(offset, limit)).await?;
    Ok(Json(records))
}

/// Missing means 0.
fn parse_count(params: &HashMap<String, String>, key: &str) -> Result<usize, RelayError> {
    match params.get(key) {
        None => Ok(0),
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|e| RelayError::BadRequest(format!("malformed {key} {raw:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StoreError;
    use rstest::rstest;

    #[rstest]
    #[case::bad_request(RelayError::BadRequest("x".into()), StatusCode::BAD_REQUEST)]
    #[case::missing_body(RelayError::Forward(ForwardError::MissingBody), StatusCode::BAD_REQUEST)]
    #[case::offset(
        RelayError::Store(StoreError::OffsetOutOfRange { offset: 9, size: 1 }),
        StatusCode::BAD_REQUEST
    )]
    #[case::unavailable(
        RelayError::Forward(ForwardError::UpstreamUnavailable { url: "u".into(), reason: "r".into() }),
        StatusCode::SERVICE_UNAVAILABLE
    )]
    #[case::body(
        RelayError::Forward(ForwardError::ResponseBody("reset".into())),
        StatusCode::BAD_GATEWAY
    )]
    #[case::fault(RelayError::Store(StoreError::StorageFault("io".into())), StatusCode::INTERNAL_SERVER_ERROR)]
    #[case::closed(RelayError::Store(StoreError::StoreClosed), StatusCode::SERVICE_UNAVAILABLE)]
    fn errors_map_to_status(#[case] err: RelayError, #[case] expected: StatusCode) {
        assert_eq!(err.into_response().status(), expected);
    }

    #[rstest]
    #[case::missing(None, Ok(0))]
    #[case::number(Some("12"), Ok(12))]
    #[case::negative(Some("-1"), Err(()))]
    #[case::garbage(Some("abc"), Err(()))]
    fn parse_count_cases(#[case] raw: Option<&str>, #[case] expected: Result<usize, ()>) {
        let mut params = HashMap::new();
        if let Some(raw) = raw {
            params.insert("offset".to_string(), raw.to_string());
        }
        let parsed = parse_count(&params, "offset").map_err(|_| ());
        assert_eq!(parsed, expected);
    }
}
