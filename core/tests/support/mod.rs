//! In-memory transport shared by the pipeline tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::oneshot;
use http_client_core::error::ErrorResponse;
use http_client_core::transport::collect_bytes;
use http_client_core::{
    ByteStream, HttpMethod, RequestDescriptor, RequestOptions, ResponseBody, ResponseEnvelope, StreamHandle,
    Transport, TransportError,
};
use serde_json::json;

/// What the transport saw for one request.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: HttpMethod,
    pub url: String,
    pub options: RequestOptions,
    pub streamed: bool,
}

/// Answers by path: `/status/{code}` fails with that code (uploads included,
/// once the payload is drained), `/stream` serves `STREAM_CHUNKS`, other
/// uploads echo their byte count, anything else returns
/// `{"method": ..., "url": ...}`.
#[derive(Default)]
pub struct MemoryTransport {
    pub seen: Mutex<Vec<Seen>>,
    pub uploads: Arc<Mutex<Vec<u8>>>,
    pub calls: AtomicUsize,
}

pub const STREAM_CHUNKS: [&str; 3] = ["first\n", "second\n", "third\n"];

impl MemoryTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn uploaded(&self) -> Vec<u8> {
        self.uploads.lock().unwrap().clone()
    }

    fn record(&self, request: &RequestDescriptor, streamed: bool) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(Seen {
            method: request.method,
            url: request.url.clone(),
            options: request.options.clone(),
            streamed,
        });
    }
}

fn status_of(url: &str) -> Option<u16> {
    url.rsplit_once("/status/").and_then(|(_, code)| code.parse().ok())
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn request(&self, request: RequestDescriptor) -> Result<ResponseEnvelope, TransportError> {
        self.record(&request, false);
        if let Some(code) = status_of(&request.url) {
            let envelope = ResponseEnvelope::new(request.method, request.url.clone(), code)
                .with_body(ResponseBody::Json(json!({"statusCodeReceived": code})));
            if code >= 400 {
                return Err(TransportError::status(ErrorResponse::from(&envelope)));
            }
            return Ok(envelope);
        }
        if request.url.contains("unreachable") {
            return Err(TransportError::connect("connection refused"));
        }
        Ok(ResponseEnvelope::new(request.method, request.url.clone(), 200)
            .with_header("Content-Type", "application/json")
            .with_body(ResponseBody::Json(json!({"method": request.method, "url": request.url}))))
    }

    fn stream(&self, mut request: RequestDescriptor) -> StreamHandle {
        self.record(&request, true);
        let envelope = ResponseEnvelope::new(request.method, request.url.clone(), 200);

        if let Some(payload) = request.payload.take() {
            let uploads = Arc::clone(&self.uploads);
            let rejected = status_of(&request.url).filter(|code| *code >= 400);
            let (tx, rx) = oneshot::channel();
            tokio::spawn(async move {
                let outcome = collect_bytes(payload).await.and_then(|bytes| {
                    let len = bytes.len();
                    *uploads.lock().unwrap() = bytes;
                    match rejected {
                        Some(code) => {
                            let failed = ResponseEnvelope { status_code: code, ..envelope };
                            Err(TransportError::status(ErrorResponse::from(&failed)))
                        }
                        None => Ok(envelope.with_body(ResponseBody::Json(json!({"bytes": len})))),
                    }
                });
                let _ = tx.send(outcome);
            });
            let response = async move { rx.await.unwrap_or_else(|_| Err(TransportError::stream("upload task gone"))) };
            return StreamHandle::new(Box::pin(response), Box::pin(futures::stream::empty()));
        }

        if let Some(code) = status_of(&request.url).filter(|code| *code >= 400) {
            let failed = ResponseEnvelope::new(request.method, request.url.clone(), code);
            return StreamHandle::failed(TransportError::status(ErrorResponse::from(&failed)));
        }

        let chunks: Vec<Result<Bytes, TransportError>> =
            STREAM_CHUNKS.iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))).collect();
        let body: ByteStream = Box::pin(futures::stream::iter(chunks));
        StreamHandle::new(Box::pin(async move { Ok(envelope) }), body)
    }
}

/// A payload stream that yields `chunks` in order, then fails with `error`.
pub fn failing_payload(chunks: &[&'static str], error: TransportError) -> ByteStream {
    let mut items: Vec<Result<Bytes, TransportError>> =
        chunks.iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))).collect();
    items.push(Err(error));
    Box::pin(futures::stream::iter(items))
}

/// A payload stream that yields `chunks` in order.
pub fn payload(chunks: &[&'static str]) -> ByteStream {
    let items: Vec<Result<Bytes, TransportError>> =
        chunks.iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))).collect();
    Box::pin(futures::stream::iter(items))
}
