//! Cancellable request operation
//!
//! [`HttpRequester::execute`] issues one request and settles with exactly
//! one outcome. Cancellation, the timeout and the transfer race inside a
//! single `select!`; whichever finishes first settles the operation and the
//! losers are dropped, which aborts an in-flight transfer. A token fired
//! after settlement has nothing left to act on.

use crate::config::HttpConfig;
use crate::connectivity::{AlwaysOnline, Connectivity};
use crate::error::RequestError;
use crate::headers::{normalize_headers, outgoing_headers};
use crate::options::RequestOptions;
use crate::result::{BodyStream, RequestResult};
use crate::retry::{with_retry, RetryConfig};
use crate::transport::{
    ReqwestTransport, TransferEvent, Transport, TransportError, TransportRequest,
};
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Optional diagnostic callback receiving lifecycle messages
pub type LogSink = dyn Fn(&str) + Send + Sync;

/// Forwards diagnostics to the optional sink
#[derive(Clone, Copy)]
struct Diagnostics<'a> {
    sink: Option<&'a LogSink>,
}

impl<'a> Diagnostics<'a> {
    fn log(&self, message: &str) {
        if let Some(sink) = self.sink {
            sink(message);
        }
    }
}

/// Issues cancellable HTTP requests over a [`Transport`]
#[derive(Clone)]
pub struct HttpRequester {
    transport: Arc<dyn Transport>,
    connectivity: Arc<dyn Connectivity>,
    default_timeout_ms: Option<u64>,
}

impl HttpRequester {
    /// Create over a transport, assuming the host is always online
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            connectivity: Arc::new(AlwaysOnline),
            default_timeout_ms: None,
        }
    }

    /// Create a reqwest-backed requester from configuration
    pub fn from_config(config: &HttpConfig) -> Result<Self, RequestError> {
        let transport = ReqwestTransport::with_config(config)?;
        Ok(Self::new(Arc::new(transport)).with_default_timeout(config.default_timeout_ms))
    }

    /// Use a custom connectivity probe
    pub fn with_connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Timeout applied to requests that set none
    pub fn with_default_timeout(mut self, timeout_ms: Option<u64>) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Execute one request
    ///
    /// Settles with exactly one of: success, [`RequestError::Transport`],
    /// [`RequestError::Timeout`] or [`RequestError::Cancelled`]. Fails
    /// immediately with [`RequestError::Offline`] when the host reports no
    /// connectivity, and with [`RequestError::Setup`] when the request
    /// cannot be wired.
    pub async fn execute(
        &self,
        options: RequestOptions,
        token: &CancellationToken,
        sink: Option<&LogSink>,
    ) -> Result<RequestResult, RequestError> {
        let diag = Diagnostics { sink };
        diag.log(&format!("request begin: {}", options.to_log_json()));

        if !self.connectivity.is_online() {
            diag.log("offline!");
            warn!(url = %options.url, "Request refused: offline");
            return Err(RequestError::Offline);
        }

        let timeout_ms = options
            .timeout
            .or(self.default_timeout_ms)
            .filter(|ms| *ms > 0);

        let request = match Self::prepare(options) {
            Ok(request) => request,
            Err(e) => {
                diag.log(&e.to_string());
                warn!(error = %e, "Request setup failed");
                return Err(e);
            }
        };

        debug!(
            method = %request.method,
            url = %request.url,
            headers = request.headers.len(),
            timeout_ms,
            transport = self.transport.name(),
            "Sending request"
        );

        diag.log("onloadstart");
        let observer = move |event: TransferEvent| diag.log(event.as_str());

        let transfer = async {
            let send = self.transport.send(request, &observer);
            match timeout_ms {
                Some(ms) => tokio::time::timeout(Duration::from_millis(ms), send)
                    .await
                    .unwrap_or(Err(TransportError::TimedOut)),
                None => send.await,
            }
        };

        let outcome = tokio::select! {
            biased;

            _ = token.cancelled() => {
                diag.log("cancelled!");
                diag.log("onabort");
                Err(RequestError::Cancelled)
            }
            result = transfer => Self::settle(result, timeout_ms, &diag),
        };

        diag.log("onloadend");

        match &outcome {
            Ok(result) => info!(status = result.status_code, "Request completed"),
            Err(RequestError::Cancelled) => debug!("Request cancelled"),
            Err(e) => warn!(error = %e, "Request failed"),
        }

        outcome
    }

    /// Execute with the retry wrapper; cancellation ends retrying at once
    pub async fn execute_with_retry(
        &self,
        options: RequestOptions,
        token: &CancellationToken,
        sink: Option<&LogSink>,
        retry: &RetryConfig,
    ) -> Result<RequestResult, RequestError> {
        let name = format!("{} {}", options.method_or_default(), options.url);
        let attempts = with_retry(retry, &name, || self.execute(options.clone(), token, sink));

        tokio::select! {
            biased;

            _ = token.cancelled() => Err(RequestError::Cancelled),
            result = attempts => result,
        }
    }

    /// Wire method, URL, headers, auth and body
    fn prepare(options: RequestOptions) -> Result<TransportRequest, RequestError> {
        let method = Method::from_bytes(options.method_or_default().as_bytes()).map_err(|_| {
            RequestError::Setup(format!("Invalid HTTP method: {:?}", options.method_or_default()))
        })?;

        let url = Url::parse(&options.url)
            .map_err(|e| RequestError::Setup(format!("Invalid URL {:?}: {}", options.url, e)))?;

        let headers = outgoing_headers(
            options.headers.as_ref(),
            options.proxy_authorization.as_deref(),
        );

        let basic_auth = options.user.map(|user| (user, options.password));

        Ok(TransportRequest {
            method,
            url,
            headers,
            body: options.data,
            basic_auth,
        })
    }

    fn settle(
        result: Result<crate::transport::TransportResponse, TransportError>,
        timeout_ms: Option<u64>,
        diag: &Diagnostics<'_>,
    ) -> Result<RequestResult, RequestError> {
        match result {
            Ok(response) => {
                diag.log("onLoad");
                Ok(RequestResult {
                    status_code: response.status,
                    headers: normalize_headers(response.headers),
                    stream: BodyStream::new(response.body),
                })
            }
            Err(TransportError::Failed { status_text }) => {
                diag.log(&format!("onError: {}", status_text.as_deref().unwrap_or_default()));
                Err(RequestError::Transport { status_text })
            }
            Err(TransportError::TimedOut) => match timeout_ms {
                Some(timeout_ms) => {
                    diag.log("onTimeout");
                    Err(RequestError::Timeout { timeout_ms })
                }
                // No deadline of ours elapsed; the transport gave up on its own
                None => {
                    let status_text = "transport timed out".to_string();
                    diag.log(&format!("onError: {}", status_text));
                    Err(RequestError::Transport {
                        status_text: Some(status_text),
                    })
                }
            },
            Err(TransportError::Setup(message)) => {
                let err = RequestError::Setup(message);
                diag.log(&err.to_string());
                Err(err)
            }
        }
    }
}
