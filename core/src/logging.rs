//! Request/response log lines and the hooks that emit them.
//!
//! Message text is pluggable; severity is not. Incoming responses log at
//! `error` for 5xx, `warn` for 4xx and `info` otherwise.

use std::sync::Arc;

use crate::hooks::Hook;
use crate::http::{RequestDescriptor, ResponseEnvelope};

/// Builds the message for an outgoing request.
pub type OutgoingLogFn = Arc<dyn Fn(&RequestDescriptor) -> String + Send + Sync>;

/// Builds the message for an incoming response.
pub type IncomingLogFn = Arc<dyn Fn(&ResponseEnvelope) -> String + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

pub fn level_for_status(status_code: u16) -> LogLevel {
    match status_code {
        500.. => LogLevel::Error,
        400..=499 => LogLevel::Warn,
        _ => LogLevel::Info,
    }
}

pub fn log_outgoing_request(request: &RequestDescriptor) -> String {
    format!("=> HTTP {} to \"{}\"", request.method, request.url)
}

pub fn log_incoming_response(response: &ResponseEnvelope) -> String {
    let marker = if response.from_cache { "**CACHED**" } else { "<=" };
    format!(
        "{marker} HTTP {} to \"{}\" returned with status code {}",
        response.request_method, response.request_url, response.status_code
    )
}

/// Before-hook that logs every outgoing request at `info`.
pub fn outgoing_hook(message: OutgoingLogFn) -> Hook {
    Hook::before_request(move |request| {
        tracing::info!(
            request_id = %request.id,
            method = %request.method,
            stream = request.is_stream(),
            "{}",
            message(request)
        );
    })
}

/// After-hook that logs every incoming response at a status-derived level.
pub fn incoming_hook(message: IncomingLogFn) -> Hook {
    Hook::after_response(move |response| {
        let text = message(&response);
        let status = response.status_code;
        match level_for_status(status) {
            LogLevel::Error => tracing::error!(status, cached = response.from_cache, "{text}"),
            LogLevel::Warn => tracing::warn!(status, cached = response.from_cache, "{text}"),
            LogLevel::Info => tracing::info!(status, cached = response.from_cache, "{text}"),
        }
        response
    })
}
