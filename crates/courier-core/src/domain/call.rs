//! Call model: what the client asks us to send, and what came back.
//!
//! JSON field names follow the wire format clients already use:
//! the descriptor is lower-case (`method`, `url`, `header`, `body`),
//! the result is PascalCase (`HttpStatusCode`, `Header`, `ContentLength`).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::errors::ForwardError;

/// Header name -> values in arrival order.
///
/// Keys are kept exactly as supplied (case-sensitive).
pub type HeaderMultiMap = BTreeMap<String, Vec<String>>;

/// Methods the forwarder knows how to issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallMethod {
    Get,
    Post,
}

impl CallMethod {
    /// Exact, case-sensitive match against the supplied method string.
    pub fn parse(raw: &str) -> Result<Self, ForwardError> {
        match raw {
            "GET" => Ok(CallMethod::Get),
            "POST" => Ok(CallMethod::Post),
            other => Err(ForwardError::UnsupportedMethod(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallMethod::Get => "GET",
            CallMethod::Post => "POST",
        }
    }
}

impl fmt::Display for CallMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CallDescriptor はクライアントが指定する外部呼び出しの内容
///
/// `method` は文字列のまま保持します（未対応のメソッドも履歴に残せるように）。
/// 検証は Forwarder 側で `CallMethod::parse` を通して行います。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDescriptor {
    pub method: String,
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub header: HeaderMultiMap,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
}

impl CallDescriptor {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: CallMethod::Get.as_str().to_string(),
            url: url.into(),
            header: HeaderMultiMap::new(),
            body: String::new(),
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: CallMethod::Post.as_str().to_string(),
            url: url.into(),
            header: HeaderMultiMap::new(),
            body: body.into(),
        }
    }

    /// Append a header value (keeps earlier values for the same key).
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.entry(name.into()).or_default().push(value.into());
        self
    }
}

/// Outcome of executing a descriptor upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResult {
    #[serde(rename = "HttpStatusCode")]
    pub status: u16,
    #[serde(rename = "Header", default, deserialize_with = "null_as_default")]
    pub header: HeaderMultiMap,
    /// Size of the body actually read, not the declared Content-Length.
    #[serde(rename = "ContentLength")]
    pub content_length: u64,
}

/// `null` decodes like a missing field. Some clients write empty maps as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
