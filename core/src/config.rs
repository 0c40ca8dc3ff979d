//! Serializable client settings.
//!
//! Function-valued overrides (log message builders, custom formatters) are
//! set on the service builder; everything that can live in a settings file or
//! the environment lives here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Settings recognized by `HttpClientService`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// Verbs to enable, case-insensitive. `None` enables all of them.
    pub include_methods: Option<Vec<String>>,
    /// Whether network-facing action entry points exist at all.
    pub expose_actions: bool,
    /// Registers the outgoing/incoming log hooks.
    pub logging: bool,
    /// `"raw"`, `"body"`, `"headers"` or `"status"`; anything else means raw.
    pub response_formatter: Option<String>,
    /// When false, transport errors reach the caller untranslated.
    pub translate_errors: bool,
    /// Request options merged under every request.
    pub default_options: Map<String, Value>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            include_methods: None,
            expose_actions: true,
            logging: true,
            response_formatter: Some("raw".to_owned()),
            translate_errors: true,
            default_options: Map::new(),
        }
    }
}

impl ClientSettings {
    /// Load settings from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from any key lookup, starting from the defaults.
    ///
    /// - `HTTP_CLIENT_INCLUDE_METHODS`: comma-separated verbs; `*` means all.
    /// - `HTTP_CLIENT_EXPOSE_ACTIONS`, `HTTP_CLIENT_LOGGING`,
    ///   `HTTP_CLIENT_TRANSLATE_ERRORS`: `1`/`true` or `0`/`false`.
    /// - `HTTP_CLIENT_RESPONSE_FORMATTER`: formatter name.
    /// - `HTTP_CLIENT_TIMEOUT_MS`: default transport timeout.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(v) = lookup("HTTP_CLIENT_INCLUDE_METHODS") {
            settings.include_methods = if v.trim() == "*" {
                None
            } else {
                Some(
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_owned)
                        .collect(),
                )
            };
        }
        if let Some(v) = lookup("HTTP_CLIENT_EXPOSE_ACTIONS") {
            settings.expose_actions = parse_flag(&v, settings.expose_actions);
        }
        if let Some(v) = lookup("HTTP_CLIENT_LOGGING") {
            settings.logging = parse_flag(&v, settings.logging);
        }
        if let Some(v) = lookup("HTTP_CLIENT_TRANSLATE_ERRORS") {
            settings.translate_errors = parse_flag(&v, settings.translate_errors);
        }
        if let Some(v) = lookup("HTTP_CLIENT_RESPONSE_FORMATTER") {
            settings.response_formatter = Some(v);
        }
        if let Some(ms) = lookup("HTTP_CLIENT_TIMEOUT_MS").and_then(|v| v.trim().parse::<u64>().ok()) {
            settings.default_options.insert("timeout".to_owned(), Value::from(ms));
        }

        settings
    }
}

fn parse_flag(value: &str, fallback: bool) -> bool {
    match value.trim() {
        "1" => true,
        "0" => false,
        v if v.eq_ignore_ascii_case("true") => true,
        v if v.eq_ignore_ascii_case("false") => false,
        _ => fallback,
    }
}
