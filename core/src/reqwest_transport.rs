//! Default `Transport` over `reqwest`.
//!
//! # Design
//! Buffered exchanges decode the body according to `responseType` and raise
//! a status error, with the exchange attached, for 4xx/5xx unless
//! `throwHttpErrors` is false. Streamed exchanges run on a spawned task: the
//! response metadata goes out on a oneshot as soon as headers arrive, and body
//! chunks follow on a bounded channel so a slow reader applies backpressure.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use tokio::sync::oneshot;

use crate::error::{ErrorResponse, TransportError, TransportErrorKind};
use crate::http::{Headers, HttpMethod, RequestDescriptor, ResponseBody, ResponseEnvelope, ResponseType};
use crate::transport::{StreamHandle, Transport};

/// Chunks buffered between the transfer task and the body reader.
const STREAM_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, TLS roots, pools, redirects).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn builder(&self, request: &RequestDescriptor) -> reqwest::RequestBuilder {
        let options = &request.options;
        let mut builder = self.client.request(to_reqwest_method(request.method), &request.url);
        for (name, value) in options.headers.iter() {
            builder = builder.header(name, value);
        }
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(json) = &options.json {
            builder = builder.json(json);
        } else if let Some(body) = &options.body {
            builder = builder.body(body.clone());
        }
        if let Some(ms) = options.timeout {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        builder
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn request(&self, request: RequestDescriptor) -> Result<ResponseEnvelope, TransportError> {
        let response = self.builder(&request).send().await.map_err(map_reqwest_error)?;
        let mut envelope = envelope_from(&request, &response);
        let raw = response.bytes().await.map_err(map_reqwest_error)?;
        let response_type = request.options.response_type.unwrap_or_default();

        match decode_body(raw, response_type) {
            Ok(body) => envelope.body = body,
            Err((err, text)) => {
                envelope.body = ResponseBody::Text(text);
                return Err(err.with_response(ErrorResponse::from(&envelope)));
            }
        }

        if envelope.status_code >= 400 && request.options.throw_http_errors != Some(false) {
            return Err(TransportError::status(ErrorResponse::from(&envelope)));
        }
        Ok(envelope)
    }

    fn stream(&self, mut request: RequestDescriptor) -> StreamHandle {
        let mut builder = self.builder(&request);
        if let Some(mut payload) = request.payload.take() {
            // Relay through a channel; the receiver is `Sync`, the payload is not.
            let (mut upload_tx, upload_rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
            tokio::spawn(async move {
                while let Some(chunk) = payload.next().await {
                    if upload_tx.send(chunk).await.is_err() {
                        break;
                    }
                }
            });
            builder = builder.body(reqwest::Body::wrap_stream(upload_rx));
        }
        let throw_http_errors = request.options.throw_http_errors != Some(false);

        let (meta_tx, meta_rx) = oneshot::channel();
        let (mut chunk_tx, chunk_rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let response = match builder.send().await {
                Ok(response) => response,
                Err(err) => {
                    let _ = meta_tx.send(Err(map_reqwest_error(err)));
                    return;
                }
            };
            let envelope = envelope_from(&request, &response);
            if envelope.status_code >= 400 && throw_http_errors {
                let _ = meta_tx.send(Err(TransportError::status(ErrorResponse::from(&envelope))));
                return;
            }
            if meta_tx.send(Ok(envelope)).is_err() {
                tracing::trace!("response listener gone; still forwarding body");
            }

            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                let item: Result<Bytes, TransportError> = chunk.map_err(map_reqwest_error);
                if chunk_tx.send(item).await.is_err() {
                    // Reader dropped the body; abandon the transfer.
                    break;
                }
            }
        });

        let response = async move {
            meta_rx
                .await
                .unwrap_or_else(|_| Err(TransportError::stream("transfer task ended before the response arrived")))
        };
        StreamHandle::new(Box::pin(response), Box::pin(chunk_rx))
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

fn envelope_from(request: &RequestDescriptor, response: &reqwest::Response) -> ResponseEnvelope {
    let headers: Headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect();
    ResponseEnvelope {
        status_code: response.status().as_u16(),
        headers,
        body: ResponseBody::Empty,
        request_url: request.url.clone(),
        request_method: request.method,
        from_cache: false,
    }
}

/// Decode a buffered body. On failure, returns the error with the body as text.
fn decode_body(raw: Bytes, response_type: ResponseType) -> Result<ResponseBody, (TransportError, String)> {
    if raw.is_empty() {
        return Ok(ResponseBody::Empty);
    }
    match response_type {
        ResponseType::Buffer => Ok(ResponseBody::Bytes(raw)),
        ResponseType::Text => Ok(ResponseBody::Text(String::from_utf8_lossy(&raw).into_owned())),
        ResponseType::Json => serde_json::from_slice(&raw).map(ResponseBody::Json).map_err(|e| {
            (
                TransportError::new(TransportErrorKind::Decode, format!("invalid JSON response body: {e}")),
                String::from_utf8_lossy(&raw).into_owned(),
            )
        }),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else if err.is_builder() {
        TransportErrorKind::InvalidRequest
    } else if err.is_decode() {
        TransportErrorKind::Decode
    } else if err.is_body() || err.is_request() {
        TransportErrorKind::Stream
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, err.to_string())
}
