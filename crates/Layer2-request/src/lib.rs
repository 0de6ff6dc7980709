//! # tether-request
//!
//! Cancellable HTTP request operation for Tether.
//!
//! ## Features
//!
//! - One outbound request per call, raw binary body, optional timeout
//! - Cooperative cancellation through a [`CancellationToken`]
//! - Exactly one terminal outcome: success, transport error, timeout or cancelled
//! - Offline short-circuit before any transport work
//! - Reserved headers (`User-Agent`, `Accept-Encoding`, `Content-Length`) never forwarded
//! - Lifecycle diagnostics through an optional log sink
//! - Optional retry wrapper with exponential backoff
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod config;
pub mod connectivity;
pub mod error;
pub mod headers;
pub mod options;
pub mod request;
pub mod result;
pub mod retry;
pub mod transport;

pub use config::{HttpConfig, HttpConfigLayer, HTTP_CONFIG_FILE};
pub use connectivity::{AlwaysOnline, Connectivity, NetworkStatus};
pub use error::RequestError;
pub use headers::{normalize_headers, outgoing_headers, parse_header_block, PROXY_AUTHORIZATION, UNSAFE_HEADERS};
pub use options::RequestOptions;
pub use request::{HttpRequester, LogSink};
pub use result::{BodyStream, RequestResult};
pub use retry::{with_retry, Backoff, RetryConfig, RetryConfigLayer, RetryableError};
pub use transport::{
    ReadyState, ReqwestTransport, TransferEvent, TransferObserver, Transport, TransportError,
    TransportRequest, TransportResponse,
};

// Re-exported so callers do not need a direct tokio-util dependency
pub use tokio_util::sync::CancellationToken;
