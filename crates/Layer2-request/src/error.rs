//! Request error types
//!
//! `RequestError` is the failure half of a request outcome. It converts into
//! `tether_foundation::Error` for callers that work with the shared type.

use tether_foundation::Error as FoundationError;
use thiserror::Error;

/// Errors that settle a request operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Host reported no connectivity; nothing was sent
    #[error("Offline: no network connectivity")]
    Offline,

    /// Low-level transfer failure (DNS, connection reset, ...)
    #[error("Transport error: {}", .status_text.as_deref().unwrap_or("request failed"))]
    Transport { status_text: Option<String> },

    /// Configured deadline elapsed
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Caller aborted through the cancellation token
    #[error("Request cancelled")]
    Cancelled,

    /// Request could not be wired (bad method, URL or header)
    #[error("Request setup failed: {0}")]
    Setup(String),
}

impl RequestError {
    /// Transport failure with the transport's status text
    pub fn transport(status_text: impl Into<String>) -> Self {
        let text = status_text.into();
        RequestError::Transport {
            status_text: (!text.is_empty()).then_some(text),
        }
    }

    /// Whether the caller cancelled; lets callers suppress cancellation noise
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RequestError::Cancelled)
    }
}

impl From<RequestError> for FoundationError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Offline => FoundationError::Offline,
            RequestError::Transport { .. } => FoundationError::Http(err.to_string()),
            RequestError::Timeout { timeout_ms } => {
                FoundationError::Timeout(format!("{}ms", timeout_ms))
            }
            RequestError::Cancelled => FoundationError::Cancelled,
            RequestError::Setup(message) => FoundationError::Setup(message),
        }
    }
}
