//! The transport capability the pipeline delegates network I/O to.
//!
//! # Design
//! The pipeline never performs I/O itself. A `Transport` executes buffered
//! exchanges and opens streamed ones. A streamed exchange is split into two
//! independent halves: a future that resolves once with the response metadata
//! (or the failure), and a byte stream carrying the response body. Completion
//! is therefore signalled by the response outcome, not by either body running
//! dry.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::Stream;

use crate::error::TransportError;
use crate::http::{RequestDescriptor, ResponseEnvelope};

/// A live byte stream: upload payloads and streamed response bodies.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Resolves once with the metadata of a streamed response.
pub type ResponseFuture = BoxFuture<'static, Result<ResponseEnvelope, TransportError>>;

/// Both halves of a streamed exchange as returned by the transport.
pub struct StreamHandle {
    pub response: ResponseFuture,
    pub body: ByteStream,
}

impl StreamHandle {
    pub fn new(response: ResponseFuture, body: ByteStream) -> Self {
        Self { response, body }
    }

    /// A handle whose response future fails immediately and whose body is empty.
    pub fn failed(error: TransportError) -> Self {
        Self {
            response: Box::pin(futures::future::ready(Err(error))),
            body: Box::pin(futures::stream::empty()),
        }
    }

    pub fn into_parts(self) -> (ResponseFuture, ByteStream) {
        (self.response, self.body)
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// HTTP execution engine consumed by the dispatcher.
///
/// Implementations own connection management, TLS, redirects, retries and
/// timeouts. They raise `TransportError` with the failed exchange attached
/// whenever a response was received.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a buffered exchange.
    async fn request(&self, request: RequestDescriptor) -> Result<ResponseEnvelope, TransportError>;

    /// Open a streamed exchange and return immediately.
    ///
    /// When `request.payload` is set, the transport pipes it into the request
    /// body. Called from within a tokio runtime.
    fn stream(&self, request: RequestDescriptor) -> StreamHandle;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn request(&self, request: RequestDescriptor) -> Result<ResponseEnvelope, TransportError> {
        (**self).request(request).await
    }

    fn stream(&self, request: RequestDescriptor) -> StreamHandle {
        (**self).stream(request)
    }
}

/// Collect every chunk of a byte stream, stopping at the first error.
pub async fn collect_bytes(mut stream: ByteStream) -> Result<Vec<u8>, TransportError> {
    use futures::StreamExt;

    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failed_handle_resolves_with_error() {
        let (response, body) = StreamHandle::failed(TransportError::connect("refused")).into_parts();
        let err = response.await.unwrap_err();
        assert_eq!(err.message, "refused");
        assert!(collect_bytes(body).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn collect_bytes_concatenates_chunks() {
        let chunks = vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))];
        let stream: ByteStream = Box::pin(futures::stream::iter(chunks));
        assert_eq!(collect_bytes(stream).await.unwrap(), b"abcd");
    }

    #[tokio::test]
    async fn collect_bytes_stops_at_error() {
        let chunks = vec![
            Ok(Bytes::from_static(b"ab")),
            Err(TransportError::stream("reset")),
            Ok(Bytes::from_static(b"cd")),
        ];
        let stream: ByteStream = Box::pin(futures::stream::iter(chunks));
        assert_eq!(collect_bytes(stream).await.unwrap_err().message, "reset");
    }
}
