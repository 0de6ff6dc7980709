//! Error types for Tether
//!
//! Every crate in the workspace reports failures through this enum; crate-local
//! error types convert into it at their boundary.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Tether error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Network
    // ========================================================================
    #[error("Offline: no network connectivity")]
    Offline,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Setup error: {0}")]
    Setup(String),

    // ========================================================================
    // Task execution
    // ========================================================================
    #[error("Unsupported execution engine: {0}")]
    UnsupportedEngine(String),

    #[error("Task error: {0}")]
    Task(String),

    // ========================================================================
    // External conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // Other
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a retry wrapper may try the operation again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::Http(_))
    }

    /// Whether the failure came from a caller-initiated cancellation
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Timeout("5000ms".into()).is_retryable());
        assert!(Error::Http("connection reset".into()).is_retryable());
        assert!(!Error::Cancelled.is_retryable());
        assert!(!Error::Offline.is_retryable());
        assert!(!Error::Setup("bad method".into()).is_retryable());
    }

    #[test]
    fn test_cancellation_is_distinct_from_transport() {
        assert!(Error::Cancelled.is_cancellation());
        assert!(!Error::Http("XHR failed".into()).is_cancellation());
    }

    #[test]
    fn test_string_conversion() {
        let err: Error = "boom".into();
        assert_eq!(err.to_string(), "Internal error: boom");
    }
}
