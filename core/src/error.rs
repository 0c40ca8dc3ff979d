//! Error types for the outbound HTTP client.
//!
//! # Design
//! `TransportError` is what the transport capability raises. It carries the
//! failed exchange only when the failure got as far as an HTTP response;
//! connection-level failures (refused, DNS, timeout before headers) have no
//! response attached. `TranslatedError` is the stable, serializable shape the
//! error translator builds from failures that do carry a response.
//! `ClientError` is what every request-path operation returns.

use serde::Serialize;

use crate::http::{Headers, HttpMethod, ResponseBody, ResponseEnvelope};

/// Message of every `TranslatedError` built by the default translator.
pub const HTTP_CLIENT_ERROR_MESSAGE: &str = "Outbound HTTP Client Error.";

/// Machine-readable code of every `TranslatedError`.
pub const HTTP_CLIENT_ERROR_CODE: &str = "HTTP_CLIENT_ERROR";

/// Coarse classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// Connection refused, DNS failure, TLS failure.
    Connect,
    /// The transport's own timeout fired.
    Timeout,
    /// A response arrived with an error-range status code.
    Status,
    /// A streamed transfer failed mid-way.
    Stream,
    /// The response body could not be decoded as requested.
    Decode,
    /// The transport rejected the request before sending it (e.g. bad URL).
    InvalidRequest,
    Other,
}

/// The failed exchange attached to errors that reached an HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: ResponseBody,
}

impl From<&ResponseEnvelope> for ErrorResponse {
    fn from(envelope: &ResponseEnvelope) -> Self {
        Self {
            status_code: envelope.status_code,
            method: envelope.request_method,
            url: envelope.request_url.clone(),
            headers: envelope.headers.clone(),
            body: envelope.body.clone(),
        }
    }
}

impl From<&ErrorResponse> for ResponseEnvelope {
    fn from(response: &ErrorResponse) -> Self {
        ResponseEnvelope {
            status_code: response.status_code,
            headers: response.headers.clone(),
            body: response.body.clone(),
            request_url: response.url.clone(),
            request_method: response.method,
            from_cache: false,
        }
    }
}

/// A failure raised by the transport capability.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
    pub response: Option<Box<ErrorResponse>>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            response: None,
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Stream, message)
    }

    /// An error-range status received from the server.
    pub fn status(response: ErrorResponse) -> Self {
        Self {
            kind: TransportErrorKind::Status,
            message: format!("Response code {}", response.status_code),
            response: Some(Box::new(response)),
        }
    }

    /// Attach the exchange that was in flight when the failure occurred.
    pub fn with_response(mut self, response: ErrorResponse) -> Self {
        self.response = Some(Box::new(response));
        self
    }

    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }
}

/// Payload of a `TranslatedError`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorData {
    pub method: Option<HttpMethod>,
    pub url: Option<String>,
    pub status_code: Option<u16>,
    /// Diagnostic trail of the original failure.
    pub stack: String,
}

/// Stable error shape for failures that carried an HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct TranslatedError {
    pub message: String,
    pub code: String,
    /// Status reported to whoever invoked the client; not the upstream status.
    pub status: u16,
    pub data: ErrorData,
}

impl TranslatedError {
    pub fn new(data: ErrorData) -> Self {
        Self {
            message: HTTP_CLIENT_ERROR_MESSAGE.to_string(),
            code: HTTP_CLIENT_ERROR_CODE.to_string(),
            status: 500,
            data,
        }
    }
}

/// Errors returned by the client's request operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Passed through untouched: no response, or translation disabled.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A failed exchange with an HTTP response, in the stable shape.
    #[error(transparent)]
    Http(#[from] TranslatedError),

    /// Produced by a caller-supplied error formatter.
    #[error("{message}")]
    Custom { message: String, data: serde_json::Value },

    /// The verb is not in this instance's enabled method set.
    #[error("HTTP method {0} is not enabled on this client")]
    MethodDisabled(HttpMethod),

    /// No action entry point with that name exists on this instance.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("invalid action params: {0}")]
    InvalidParams(String),
}

impl ClientError {
    /// Upstream status code, when the failure reached an HTTP response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Transport(err) => err.response.as_ref().map(|r| r.status_code),
            ClientError::Http(err) => err.data.status_code,
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> ErrorResponse {
        ErrorResponse {
            status_code: 404,
            method: HttpMethod::Get,
            url: "http://localhost/missing".to_string(),
            headers: Headers::new(),
            body: ResponseBody::Empty,
        }
    }

    #[test]
    fn status_error_carries_response() {
        let err = TransportError::status(not_found());
        assert_eq!(err.kind, TransportErrorKind::Status);
        assert!(err.has_response());
        assert_eq!(err.to_string(), "Response code 404");
    }

    #[test]
    fn connect_error_has_no_response() {
        let err = TransportError::connect("connection refused");
        assert!(!err.has_response());
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn translated_error_serializes_stable_shape() {
        let err = TranslatedError::new(ErrorData {
            method: Some(HttpMethod::Get),
            url: Some("http://localhost/missing".to_string()),
            status_code: Some(404),
            stack: String::new(),
        });
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["message"], HTTP_CLIENT_ERROR_MESSAGE);
        assert_eq!(json["code"], HTTP_CLIENT_ERROR_CODE);
        assert_eq!(json["data"]["method"], "GET");
        assert_eq!(json["data"]["statusCode"], 404);
    }

    #[test]
    fn client_error_reports_upstream_status() {
        let err = ClientError::from(TransportError::status(not_found()));
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(ClientError::MethodDisabled(HttpMethod::Put).status_code(), None);
    }
}
