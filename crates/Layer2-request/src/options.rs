//! Request options

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Input descriptor for one request
///
/// Secrets and the body are never serialized, so the JSON form is safe to
/// write to diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    /// HTTP method; `GET` when absent
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Absolute target URL
    pub url: String,

    /// Request body bytes
    #[serde(skip)]
    pub data: Option<Bytes>,

    /// Header name -> value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,

    /// Basic-auth user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Basic-auth password
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Value for the `Proxy-Authorization` header
    #[serde(skip_serializing)]
    pub proxy_authorization: Option<String>,

    /// Timeout in milliseconds; `0` means none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl RequestOptions {
    /// Options for a request to `url` (method defaults to GET)
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url).method("GET")
    }

    /// POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url).method("POST")
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Add a header (later values for the same name replace earlier ones)
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn basic_auth(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.user = Some(user.into());
        self.password = password;
        self
    }

    pub fn proxy_authorization(mut self, token: impl Into<String>) -> Self {
        self.proxy_authorization = Some(token.into());
        self
    }

    pub fn timeout_ms(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Effective method name
    pub fn method_or_default(&self) -> &str {
        self.method.as_deref().unwrap_or("GET")
    }

    /// JSON form for diagnostics
    pub fn to_log_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"url\":{:?}}}", self.url))
    }
}
