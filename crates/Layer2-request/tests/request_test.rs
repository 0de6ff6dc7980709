use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::net::TcpListener;

use tether_request::{
    CancellationToken, HttpRequester, ReqwestTransport, RequestError, RequestOptions,
};

/// Reports back the request headers the server saw
async fn echo_headers(req: Request) -> impl IntoResponse {
    let seen = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("<none>")
            .to_string()
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain".to_string()),
            (header::HeaderName::from_static("x-seen-trace"), seen("x-trace")),
            (header::HeaderName::from_static("x-seen-ua"), seen("user-agent")),
            (header::HeaderName::from_static("x-seen-proxy"), seen("proxy-authorization")),
            (header::HeaderName::from_static("x-seen-auth"), seen("authorization")),
        ],
        "ok",
    )
}

/// Returns the raw bytes of the `x-trace` request header as the body
async fn echo_trace(req: Request) -> impl IntoResponse {
    req.headers()
        .get("x-trace")
        .map(|v| Bytes::copy_from_slice(v.as_bytes()))
        .unwrap_or_default()
}

async fn echo_body(body: Bytes) -> impl IntoResponse {
    (StatusCode::CREATED, body)
}

async fn slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(30)).await;
    "late"
}

async fn missing() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nope")
}

async fn start_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/headers", get(echo_headers))
        .route("/trace", get(echo_trace))
        .route("/echo", post(echo_body))
        .route("/slow", get(slow))
        .route("/missing", get(missing));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

fn requester() -> HttpRequester {
    // Loopback server; ignore any proxy configured in the environment
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    HttpRequester::new(Arc::new(ReqwestTransport::with_client(client)))
}

#[tokio::test]
async fn test_get_normalizes_and_streams() {
    let (addr, _handle) = start_server().await;
    let options = RequestOptions::get(format!("http://{}/headers", addr))
        .header("X-Trace", "abc")
        .header("User-Agent", "evil")
        .timeout_ms(5000);

    let result = requester()
        .execute(options, &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(result.status_code, 200);
    assert_eq!(result.header("content-type"), Some("text/plain"));
    assert_eq!(result.header("x-seen-trace"), Some("abc"));
    assert_ne!(result.header("x-seen-ua"), Some("evil"));
    assert!(result.headers.keys().all(|k| *k == k.to_lowercase()));

    let body: Vec<Bytes> = result.stream.collect().await;
    assert_eq!(body, vec![Bytes::from_static(b"ok")]);
}

#[tokio::test]
async fn test_proxy_authorization_and_basic_auth_forwarded() {
    let (addr, _handle) = start_server().await;
    let options = RequestOptions::get(format!("http://{}/headers", addr))
        .proxy_authorization("Basic cHJveHk6cGFzcw==")
        .basic_auth("alice", Some("secret".to_string()));

    let result = requester()
        .execute(options, &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(result.header("x-seen-proxy"), Some("Basic cHJveHk6cGFzcw=="));
    assert_eq!(result.header("x-seen-auth"), Some("Basic YWxpY2U6c2VjcmV0"));
}

#[tokio::test]
async fn test_non_ascii_header_value_reaches_server_unmodified() {
    let (addr, _handle) = start_server().await;
    let options = RequestOptions::get(format!("http://{}/trace", addr)).header("X-Trace", "café");

    let result = requester()
        .execute(options, &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(result.status_code, 200);
    assert_eq!(result.stream.into_bytes(), Bytes::from("café"));
}

#[tokio::test]
async fn test_post_body_round_trip() {
    let (addr, _handle) = start_server().await;
    let options = RequestOptions::post(format!("http://{}/echo", addr))
        .header("Content-Length", "999")
        .body(vec![0u8, 1, 2, 255]);

    let result = requester()
        .execute(options, &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(result.status_code, 201);
    assert_eq!(result.stream.into_bytes(), Bytes::from_static(&[0, 1, 2, 255]));
}

#[tokio::test]
async fn test_error_status_is_still_success() {
    let (addr, _handle) = start_server().await;

    let result = requester()
        .execute(
            RequestOptions::get(format!("http://{}/missing", addr)),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(result.status_code, 404);
    assert_eq!(result.stream.into_bytes(), Bytes::from_static(b"nope"));
}

#[tokio::test]
async fn test_timeout_against_slow_server() {
    let (addr, _handle) = start_server().await;

    let err = requester()
        .execute(
            RequestOptions::get(format!("http://{}/slow", addr)).timeout_ms(200),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(err, RequestError::Timeout { timeout_ms: 200 });
}

#[tokio::test]
async fn test_cancel_against_slow_server() {
    let (addr, _handle) = start_server().await;
    let token = CancellationToken::new();
    let lines = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink_lines = Arc::clone(&lines);
    let sink = move |msg: &str| sink_lines.lock().push(msg.to_string());

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let err = requester()
        .execute(RequestOptions::get(format!("http://{}/slow", addr)), &token, Some(&sink))
        .await
        .unwrap_err();

    assert_eq!(err, RequestError::Cancelled);
    let lines = lines.lock();
    assert!(lines.iter().any(|l| l == "cancelled!"));
    assert!(!lines.iter().any(|l| l == "onLoad"));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = requester()
        .execute(
            RequestOptions::get(format!("http://{}/", addr)).timeout_ms(5000),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();

    let RequestError::Transport { status_text: Some(text) } = err else {
        panic!("expected a transport error, got {:?}", err);
    };
    assert!(text.to_lowercase().contains("refused"), "cause missing from {:?}", text);
}

#[tokio::test]
async fn test_invalid_header_name_is_setup_error() {
    let (addr, _handle) = start_server().await;

    let err = requester()
        .execute(
            RequestOptions::get(format!("http://{}/headers", addr)).header("Bad Header", "x"),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RequestError::Setup(_)));
}
