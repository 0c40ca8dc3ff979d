//! Maps transport failures onto the error callers see.
//!
//! Failures without an HTTP response are infrastructure problems and reach
//! the caller exactly as the transport raised them. Failures with a response
//! become a `TranslatedError` unless translation has been switched off.

use std::fmt;
use std::sync::Arc;

use crate::error::{ClientError, ErrorData, ErrorResponse, TranslatedError, TransportError};

pub type ErrorFormatFn = Arc<dyn Fn(TransportError) -> ClientError + Send + Sync>;

#[derive(Clone, Default)]
pub enum ErrorFormatter {
    /// Re-raise every transport error verbatim.
    Disabled,
    #[default]
    Builtin,
    /// Replaces the built-in translation for failures that carry a response.
    Custom(ErrorFormatFn),
}

impl ErrorFormatter {
    pub fn custom(f: impl Fn(TransportError) -> ClientError + Send + Sync + 'static) -> Self {
        ErrorFormatter::Custom(Arc::new(f))
    }

    pub fn translate(&self, error: TransportError) -> ClientError {
        if matches!(self, ErrorFormatter::Disabled) || !error.has_response() {
            return ClientError::Transport(error);
        }
        match self {
            ErrorFormatter::Custom(f) => f(error),
            _ => match error.response.as_deref() {
                Some(response) => ClientError::Http(translate_with_response(&error, response)),
                None => ClientError::Transport(error),
            },
        }
    }
}

impl fmt::Debug for ErrorFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorFormatter::Disabled => f.write_str("ErrorFormatter::Disabled"),
            ErrorFormatter::Builtin => f.write_str("ErrorFormatter::Builtin"),
            ErrorFormatter::Custom(_) => f.write_str("ErrorFormatter::Custom"),
        }
    }
}

/// Build the stable error shape from a failed exchange.
pub fn translate_with_response(error: &TransportError, response: &ErrorResponse) -> TranslatedError {
    TranslatedError::new(ErrorData {
        method: Some(response.method),
        url: Some(response.url.clone()),
        status_code: Some(response.status_code),
        stack: format!(
            "TransportError[{:?}]: {}\n    at {} {}",
            error.kind, error.message, response.method, response.url
        ),
    })
}
