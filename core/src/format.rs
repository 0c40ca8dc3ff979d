//! Projections of a response envelope handed back to callers.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::hooks::panic_message;
use crate::http::{Headers, ResponseBody, ResponseEnvelope};

pub type FormatFn = Arc<dyn Fn(ResponseEnvelope) -> FormattedResponse + Send + Sync>;

/// Closed registry of response projections, plus a custom escape hatch.
#[derive(Clone, Default)]
pub enum ResponseFormatter {
    /// The envelope unchanged.
    #[default]
    Raw,
    Body,
    Headers,
    Status,
    Custom(FormatFn),
}

impl ResponseFormatter {
    /// Names accepted by `from_name`.
    pub const NAMES: [&'static str; 4] = ["body", "headers", "status", "raw"];

    /// Look a formatter up by name. Unknown or absent names fall back to `Raw`.
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some("body") => ResponseFormatter::Body,
            Some("headers") => ResponseFormatter::Headers,
            Some("status") => ResponseFormatter::Status,
            Some("raw") | None => ResponseFormatter::Raw,
            Some(other) => {
                tracing::debug!(formatter = other, "unknown response formatter; using raw");
                ResponseFormatter::Raw
            }
        }
    }

    pub fn custom(f: impl Fn(ResponseEnvelope) -> FormattedResponse + Send + Sync + 'static) -> Self {
        ResponseFormatter::Custom(Arc::new(f))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResponseFormatter::Raw => "raw",
            ResponseFormatter::Body => "body",
            ResponseFormatter::Headers => "headers",
            ResponseFormatter::Status => "status",
            ResponseFormatter::Custom(_) => "custom",
        }
    }

    /// Project the envelope. A panicking custom formatter yields the raw envelope.
    pub fn format(&self, envelope: ResponseEnvelope) -> FormattedResponse {
        match self {
            ResponseFormatter::Raw => FormattedResponse::Raw(envelope),
            ResponseFormatter::Body => FormattedResponse::Body(envelope.body),
            ResponseFormatter::Headers => FormattedResponse::Headers(envelope.headers),
            ResponseFormatter::Status => FormattedResponse::Status(envelope.status_code),
            ResponseFormatter::Custom(f) => {
                let fallback = envelope.clone();
                match catch_unwind(AssertUnwindSafe(|| f(envelope))) {
                    Ok(formatted) => formatted,
                    Err(panic) => {
                        tracing::warn!(
                            reason = %panic_message(panic.as_ref()),
                            "custom response formatter failed; returning raw envelope"
                        );
                        FormattedResponse::Raw(fallback)
                    }
                }
            }
        }
    }
}

impl fmt::Debug for ResponseFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResponseFormatter({})", self.name())
    }
}

/// The value a buffered request resolves to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FormattedResponse {
    Raw(ResponseEnvelope),
    Body(ResponseBody),
    Headers(Headers),
    Status(u16),
    /// Output of a custom formatter.
    Value(Value),
}

impl FormattedResponse {
    pub fn as_envelope(&self) -> Option<&ResponseEnvelope> {
        match self {
            FormattedResponse::Raw(envelope) => Some(envelope),
            _ => None,
        }
    }

    pub fn into_envelope(self) -> Option<ResponseEnvelope> {
        match self {
            FormattedResponse::Raw(envelope) => Some(envelope),
            _ => None,
        }
    }

    /// The response body, whether projected alone or inside a raw envelope.
    pub fn body(&self) -> Option<&ResponseBody> {
        match self {
            FormattedResponse::Raw(envelope) => Some(&envelope.body),
            FormattedResponse::Body(body) => Some(body),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http::HttpMethod;

    fn envelope() -> ResponseEnvelope {
        ResponseEnvelope::new(HttpMethod::Get, "http://localhost:4000/json", 200)
            .with_header("Content-Type", "application/json")
            .with_body(ResponseBody::Json(json!({"hello": 200})))
    }

    #[test]
    fn every_listed_name_resolves_to_itself() {
        for name in ResponseFormatter::NAMES {
            assert_eq!(ResponseFormatter::from_name(Some(name)).name(), name);
        }
    }

    #[test]
    fn body_returns_only_the_body() {
        let out = ResponseFormatter::from_name(Some("body")).format(envelope());
        assert_eq!(out, FormattedResponse::Body(ResponseBody::Json(json!({"hello": 200}))));
        assert_eq!(out.to_json(), json!({"hello": 200}));
    }

    #[test]
    fn status_returns_only_the_status() {
        let out = ResponseFormatter::from_name(Some("status")).format(envelope());
        assert_eq!(out, FormattedResponse::Status(200));
        assert_eq!(out.to_json(), json!(200));
    }

    #[test]
    fn headers_returns_only_the_headers() {
        let out = ResponseFormatter::from_name(Some("headers")).format(envelope());
        let FormattedResponse::Headers(headers) = out else {
            panic!("expected headers, got {out:?}");
        };
        assert_eq!(headers.get("content-type"), Some("application/json"));
    }

    #[test]
    fn unknown_or_missing_name_falls_back_to_raw() {
        for name in [None, Some("raw"), Some("xml"), Some("")] {
            let out = ResponseFormatter::from_name(name).format(envelope());
            assert_eq!(out, FormattedResponse::Raw(envelope()), "{name:?}");
        }
    }

    #[test]
    fn custom_formatter_is_used() {
        let formatter = ResponseFormatter::custom(|e| FormattedResponse::Value(json!({"code": e.status_code})));
        assert_eq!(formatter.format(envelope()).to_json(), json!({"code": 200}));
        assert_eq!(formatter.name(), "custom");
    }

    #[test]
    fn panicking_custom_formatter_returns_raw() {
        let formatter = ResponseFormatter::custom(|_| panic!("bad formatter"));
        assert_eq!(formatter.format(envelope()), FormattedResponse::Raw(envelope()));
    }
}
