//! HttpForwarder - reqwest による外部呼び出し
//!
//! # 方針
//! - メソッド検証・POST ボディ検証はネットワークに触れる前に行う
//! - GET でも descriptor のヘッダを送る（POST と同じ扱い）
//! - 同じキーの複数値はすべて append（上書きしない）
//! - タイムアウトは既定でなし（`ForwarderConfig::timeout` で設定可能）

use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder};
use tracing::{debug, info};

use crate::config::ForwarderConfig;
use crate::domain::{CallDescriptor, CallMethod, CallResult, ForwardError, HeaderMultiMap};
use crate::ports::Forwarder;

/// Forwarder backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: Client,
}

impl HttpForwarder {
    pub fn new(config: &ForwarderConfig) -> Result<Self, ForwardError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ForwardError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Use an already configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn build_request(&self, descriptor: &CallDescriptor) -> Result<RequestBuilder, ForwardError> {
        let method = CallMethod::parse(&descriptor.method)?;
        let request = match method {
            CallMethod::Get => self.client.get(&descriptor.url),
            CallMethod::Post => {
                if descriptor.body.is_empty() {
                    return Err(ForwardError::MissingBody);
                }
                self.client.post(&descriptor.url).body(descriptor.body.clone())
            }
        };
        Ok(append_headers(request, &descriptor.header))
    }
}

#[async_trait::async_trait]
impl Forwarder for HttpForwarder {
    async fn execute(&self, descriptor: &CallDescriptor) -> Result<CallResult, ForwardError> {
        let request = self.build_request(descriptor)?;
        info!(method = %descriptor.method, url = %descriptor.url, "forwarding call");

        let response = request
            .send()
            .await
            .map_err(|e| classify_send_error(e, &descriptor.url))?;

        let status = response.status().as_u16();
        let header = header_multimap(response.headers());

        // 宣言された Content-Length は信用せず、最後まで読んで数える
        let body = response
            .bytes()
            .await
            .map_err(|e| ForwardError::ResponseBody(e.to_string()))?;

        debug!(status, content_length = body.len(), "upstream call finished");
        Ok(CallResult {
            status,
            header,
            content_length: body.len() as u64,
        })
    }
}

/// `RequestBuilder::header` appends, so repeated keys keep every value.
fn append_headers(mut request: RequestBuilder, headers: &HeaderMultiMap) -> RequestBuilder {
    for (name, values) in headers {
        for value in values {
            request = request.header(name.as_str(), value.as_str());
        }
    }
    request
}

fn header_multimap(headers: &HeaderMap) -> HeaderMultiMap {
    let mut out = HeaderMultiMap::new();
    for (name, value) in headers {
        out.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    out
}

fn classify_send_error(err: reqwest::Error, url: &str) -> ForwardError {
    if err.is_builder() {
        return ForwardError::InvalidRequest(err.to_string());
    }
    ForwardError::UpstreamUnavailable {
        url: url.to_string(),
        reason: err.to_string(),
    }
}
