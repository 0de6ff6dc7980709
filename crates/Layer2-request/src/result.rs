//! Request result

use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Successful outcome of a request; built once, never mutated
#[derive(Debug)]
pub struct RequestResult {
    /// HTTP status code
    pub status_code: u16,

    /// Lowercased, trimmed header names -> trimmed values
    pub headers: HashMap<String, String>,

    /// Response body
    pub stream: BodyStream,
}

impl RequestResult {
    /// Header lookup by lowercase name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Finite, single-pass byte stream over a body already buffered by the transport
///
/// Yields the whole body as one chunk (nothing for an empty body), then ends.
#[derive(Debug, Default)]
pub struct BodyStream {
    buffer: Option<Bytes>,
}

impl BodyStream {
    pub fn new(body: Bytes) -> Self {
        Self { buffer: Some(body) }
    }

    /// Consume the stream and return the remaining bytes
    pub fn into_bytes(self) -> Bytes {
        self.buffer.unwrap_or_default()
    }
}

impl Stream for BodyStream {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.buffer.take().filter(|chunk| !chunk.is_empty()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.buffer {
            Some(chunk) if !chunk.is_empty() => (1, Some(1)),
            _ => (0, Some(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_stream_yields_once() {
        let mut stream = BodyStream::new(Bytes::from_static(b"ok"));

        assert_eq!(stream.next().await, Some(Bytes::from_static(b"ok")));
        assert_eq!(stream.next().await, None);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_empty_body_ends_immediately() {
        let mut stream = BodyStream::new(Bytes::new());
        assert_eq!(stream.size_hint(), (0, Some(0)));
        assert_eq!(stream.next().await, None);
    }

    #[test]
    fn test_into_bytes() {
        let stream = BodyStream::new(Bytes::from_static(b"payload"));
        assert_eq!(stream.into_bytes(), Bytes::from_static(b"payload"));
    }
}
