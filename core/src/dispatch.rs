//! Chooses buffered or streamed execution and drives the hook pipeline.
//!
//! # Design
//! - Buffered: before-hooks, one transport call, after-hooks, formatter.
//!   Failures go through the error formatter. A failure that carries a
//!   response still passes that response through the after-hooks first.
//! - Streamed download (no payload): the transport handle is returned at once.
//!   A spawned listener awaits the response metadata, runs the after-hooks on
//!   it exactly once and forwards the outcome; it never touches body bytes.
//! - Streamed upload: the payload is handed to the transport and the call
//!   completes on the transport's response outcome, never on payload end.
//!
//! Formatting is skipped for both streamed paths.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tracing::Instrument;

use crate::error::{ClientError, ClientResult, TransportError};
use crate::format::{FormattedResponse, ResponseFormatter};
use crate::hooks::HookPipeline;
use crate::http::{RequestDescriptor, RequestOptions, ResponseEnvelope};
use crate::transport::{ByteStream, ResponseFuture, Transport};
use crate::translate::ErrorFormatter;

/// Streamed response as handed to the caller.
pub struct ResponseStream {
    /// Resolves once, after the after-hooks have seen the metadata.
    pub response: BoxFuture<'static, ClientResult<ResponseEnvelope>>,
    pub body: ByteStream,
}

impl ResponseStream {
    pub fn into_parts(self) -> (BoxFuture<'static, ClientResult<ResponseEnvelope>>, ByteStream) {
        (self.response, self.body)
    }
}

impl fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseStream").finish_non_exhaustive()
    }
}

/// Outcome of a dispatched request.
#[derive(Debug)]
pub enum Dispatched {
    /// Buffered exchange, projected by the response formatter.
    Response(FormattedResponse),
    /// Streamed download; the caller consumes the body.
    Stream(ResponseStream),
    /// Streamed upload; metadata of the transport's final response.
    Upload(ResponseEnvelope),
}

impl Dispatched {
    pub fn into_response(self) -> Option<FormattedResponse> {
        match self {
            Dispatched::Response(response) => Some(response),
            _ => None,
        }
    }

    pub fn into_stream(self) -> Option<ResponseStream> {
        match self {
            Dispatched::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn into_upload(self) -> Option<ResponseEnvelope> {
        match self {
            Dispatched::Upload(envelope) => Some(envelope),
            _ => None,
        }
    }
}

pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    hooks: Arc<HookPipeline>,
    formatter: ResponseFormatter,
    errors: ErrorFormatter,
    defaults: RequestOptions,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        hooks: HookPipeline,
        formatter: ResponseFormatter,
        errors: ErrorFormatter,
        defaults: RequestOptions,
    ) -> Self {
        Self {
            transport,
            hooks: Arc::new(hooks),
            formatter,
            errors,
            defaults,
        }
    }

    pub fn hooks(&self) -> &HookPipeline {
        &self.hooks
    }

    pub fn formatter(&self) -> &ResponseFormatter {
        &self.formatter
    }

    pub async fn dispatch(&self, mut request: RequestDescriptor) -> ClientResult<Dispatched> {
        request.options.merge_defaults(&self.defaults);
        let span = tracing::info_span!(
            "http_request",
            request_id = %request.id,
            method = %request.method,
            url = %request.url,
        );
        async move {
            if request.is_stream() {
                self.dispatch_stream(request).await
            } else {
                self.dispatch_buffered(request).await
            }
        }
        .instrument(span)
        .await
    }

    async fn dispatch_buffered(&self, request: RequestDescriptor) -> ClientResult<Dispatched> {
        self.hooks.run_before(&request);
        match self.transport.request(request).await {
            Ok(envelope) => {
                let envelope = self.hooks.run_after(envelope);
                Ok(Dispatched::Response(self.formatter.format(envelope)))
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    async fn dispatch_stream(&self, request: RequestDescriptor) -> ClientResult<Dispatched> {
        self.hooks.run_before(&request);
        let uploading = request.is_upload();
        let (response, body) = self.transport.stream(request).into_parts();

        if uploading {
            // Dropping the response body leaves the transport to drain it.
            drop(body);
            return match response.await {
                Ok(envelope) => Ok(Dispatched::Upload(self.hooks.run_after(envelope))),
                Err(err) => Err(self.fail(err)),
            };
        }

        Ok(Dispatched::Stream(ResponseStream {
            response: self.observe(response),
            body,
        }))
    }

    /// Spawn the listener that logs a streamed response once its headers arrive.
    fn observe(&self, response: ResponseFuture) -> BoxFuture<'static, ClientResult<ResponseEnvelope>> {
        let hooks = Arc::clone(&self.hooks);
        let errors = self.errors.clone();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(
            async move {
                let outcome = match response.await {
                    Ok(envelope) => Ok(hooks.run_after(envelope)),
                    Err(err) => {
                        tracing::debug!(error = %err, "streamed request failed");
                        observe_failure(&hooks, &err);
                        Err(errors.translate(err))
                    }
                };
                // The caller may only care about the body and drop the receiver.
                let _ = tx.send(outcome);
            }
            .in_current_span(),
        );

        Box::pin(async move {
            rx.await.unwrap_or_else(|_| {
                Err(ClientError::Transport(TransportError::stream(
                    "response listener ended before the response arrived",
                )))
            })
        })
    }

    fn fail(&self, err: TransportError) -> ClientError {
        tracing::debug!(error = %err, kind = ?err.kind, has_response = err.has_response(), "request failed");
        observe_failure(&self.hooks, &err);
        self.errors.translate(err)
    }
}

/// Run the after-hooks on the error-range response a failure carries, if any.
fn observe_failure(hooks: &HookPipeline, err: &TransportError) {
    if let Some(response) = err.response.as_deref() {
        hooks.run_after(ResponseEnvelope::from(response));
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("hooks", &self.hooks)
            .field("formatter", &self.formatter)
            .field("errors", &self.errors)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}
