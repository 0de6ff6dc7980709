//! Transport seam
//!
//! A [`Transport`] performs one transfer and reports intermediate lifecycle
//! events to an observer. The request operation owns the outcome: timeouts
//! and cancellation are applied around the transfer future, and dropping
//! that future aborts the transfer.

use crate::config::HttpConfig;
use crate::error::RequestError;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client, Method, Proxy};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// A fully wired request handed to the transport
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    /// Already filtered of reserved names
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    /// Basic-auth user and optional password
    pub basic_auth: Option<(String, Option<String>)>,
}

/// Raw transfer result
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    /// Header lines as received, not yet normalized
    pub headers: Vec<(String, String)>,
    /// Whole binary body
    pub body: Bytes,
}

/// Transfer failure as seen by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be wired
    Setup(String),

    /// The transfer failed; status text when the transport has one
    Failed { status_text: Option<String> },

    /// The transport's own deadline elapsed
    TimedOut,
}

/// Ready state of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    HeadersReceived,
    Loading,
    Done,
}

/// Intermediate lifecycle notification; carries nothing needed for correctness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEvent {
    ReadyStateChange(ReadyState),
    Progress { loaded: u64, total: Option<u64> },
}

impl TransferEvent {
    /// Diagnostic line for the log sink
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferEvent::ReadyStateChange(_) => "onreadystatechange",
            TransferEvent::Progress { .. } => "onprogress",
        }
    }
}

/// Observer for intermediate transfer events
pub type TransferObserver<'a> = &'a (dyn Fn(TransferEvent) + Send + Sync);

/// Transport trait - implement to add new transfer backends
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one transfer, buffering the full body
    async fn send(
        &self,
        request: TransportRequest,
        observer: TransferObserver<'_>,
    ) -> Result<TransportResponse, TransportError>;

    /// Transport name
    fn name(&self) -> &'static str;
}

// ============================================================================
// reqwest transport
// ============================================================================

/// Transport backed by a shared `reqwest::Client`
///
/// The client adds no `User-Agent` and negotiates no compression, so the
/// reserved headers are left entirely to the HTTP stack.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create with default configuration
    pub fn new() -> Result<Self, RequestError> {
        Self::with_config(&HttpConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(config: &HttpConfig) -> Result<Self, RequestError> {
        let mut builder =
            Client::builder().connect_timeout(Duration::from_millis(config.connect_timeout_ms));

        if let Some(proxy) = &config.proxy {
            let proxy = Proxy::all(proxy)
                .map_err(|e| RequestError::Setup(format!("Invalid proxy {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| RequestError::Setup(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// A connect timeout is a failed connection, not the request deadline
    fn classify(err: reqwest::Error) -> TransportError {
        if err.is_builder() {
            TransportError::Setup(error_chain(&err))
        } else if err.is_timeout() && !err.is_connect() {
            TransportError::TimedOut
        } else {
            TransportError::Failed {
                status_text: Some(error_chain(&err)),
            }
        }
    }
}

/// Message of `err` followed by each distinct cause, `: `-separated
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: TransportRequest,
        observer: TransferObserver<'_>,
    ) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.request(request.method, request.url);

        for (name, value) in &request.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Setup(format!("Invalid header name {:?}: {}", name, e)))?;
            let header_value = HeaderValue::from_bytes(value.as_bytes()).map_err(|e| {
                TransportError::Setup(format!("Invalid value for header {:?}: {}", name, e))
            })?;
            builder = builder.header(header_name, header_value);
        }

        if let Some((user, password)) = request.basic_auth {
            builder = builder.basic_auth(user, password);
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let mut response = builder.send().await.map_err(Self::classify)?;
        observer(TransferEvent::ReadyStateChange(ReadyState::HeadersReceived));

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let total = response.content_length();
        let mut body = BytesMut::new();
        observer(TransferEvent::ReadyStateChange(ReadyState::Loading));

        while let Some(chunk) = response.chunk().await.map_err(Self::classify)? {
            body.extend_from_slice(&chunk);
            observer(TransferEvent::Progress {
                loaded: body.len() as u64,
                total,
            });
        }

        observer(TransferEvent::ReadyStateChange(ReadyState::Done));
        debug!(status, bytes = body.len(), "Transfer complete");

        Ok(TransportResponse {
            status,
            headers,
            body: body.freeze(),
        })
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}
