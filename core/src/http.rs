//! HTTP data types shared by every stage of the request pipeline.
//!
//! # Design
//! These types describe outbound requests and inbound responses as plain
//! data. The pipeline builds `RequestDescriptor` values and consumes
//! `ResponseEnvelope` values without touching the network itself; the
//! injected `Transport` executes the actual I/O.
//!
//! All fields use owned types so descriptors and envelopes can move freely
//! between hooks, spawned listener tasks and caches.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::transport::ByteStream;

/// HTTP verb supported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Every verb, in registration order.
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Lowercase name used for action entry points (`"get"`, `"post"`, ...).
    pub fn action_name(self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
        }
    }

    /// Case-insensitive lookup by verb name.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(name))
    }

    /// Whether the verb carries a request body (POST/PUT/PATCH).
    pub fn carries_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header map with case-insensitive names. Names are stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>")]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any previous value under the same name.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0.insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy every header of `other` that is not already set here.
    pub fn fill_from(&mut self, other: &Headers) {
        for (name, value) in &other.0 {
            self.0.entry(name.clone()).or_insert_with(|| value.clone());
        }
    }
}

impl From<BTreeMap<String, String>> for Headers {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// How the transport should decode a buffered response body.
///
/// Parsing is the transport's job; the pipeline never inspects body bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Text,
    Json,
    Buffer,
}

/// Per-request options.
///
/// Recognized keys are lifted into typed fields; anything else the caller
/// passes ends up in `extra` and is handed to the transport untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Always set by the normalizer, overwriting anything the caller sent.
    pub method: Option<HttpMethod>,
    pub headers: Headers,
    pub query: BTreeMap<String, String>,
    /// JSON request body. Takes precedence over `body`.
    pub json: Option<Value>,
    pub body: Option<String>,
    pub response_type: Option<ResponseType>,
    /// Transport timeout in milliseconds.
    pub timeout: Option<u64>,
    pub is_stream: bool,
    /// Cache directive; `Some(false)` bypasses any configured cache.
    pub cache: Option<bool>,
    /// Cache lifetime in milliseconds.
    pub cache_ttl: Option<u64>,
    /// When `Some(false)`, error-range statuses are returned as responses.
    pub throw_http_errors: Option<bool>,
    pub extra: Map<String, Value>,
}

impl RequestOptions {
    /// Fill every unset option from `defaults`.
    ///
    /// Header, query and passthrough maps merge key by key with the caller's
    /// entries winning. Streaming is a per-call decision and is never
    /// inherited.
    pub fn merge_defaults(&mut self, defaults: &RequestOptions) {
        self.headers.fill_from(&defaults.headers);
        for (key, value) in &defaults.query {
            self.query.entry(key.clone()).or_insert_with(|| value.clone());
        }
        for (key, value) in &defaults.extra {
            self.extra.entry(key.clone()).or_insert_with(|| value.clone());
        }
        if self.json.is_none() && self.body.is_none() {
            self.json.clone_from(&defaults.json);
            self.body.clone_from(&defaults.body);
        }
        self.response_type = self.response_type.or(defaults.response_type);
        self.timeout = self.timeout.or(defaults.timeout);
        self.cache = self.cache.or(defaults.cache);
        self.cache_ttl = self.cache_ttl.or(defaults.cache_ttl);
        self.throw_http_errors = self.throw_http_errors.or(defaults.throw_http_errors);
    }
}

/// A single outbound request, as produced by the normalizer.
pub struct RequestDescriptor {
    /// Correlates the outgoing and incoming log lines of one exchange.
    pub id: Uuid,
    pub url: String,
    pub method: HttpMethod,
    pub options: RequestOptions,
    /// Present only for streamed POST/PUT/PATCH uploads.
    pub payload: Option<ByteStream>,
}

impl RequestDescriptor {
    pub fn is_stream(&self) -> bool {
        self.options.is_stream
    }

    /// Whether this request pipes a caller-supplied payload to the transport.
    pub fn is_upload(&self) -> bool {
        self.options.is_stream && self.method.carries_body() && self.payload.is_some()
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("method", &self.method)
            .field("options", &self.options)
            .field("payload", &self.payload.as_ref().map(|_| "<stream>"))
            .finish()
    }
}

/// A response body as decoded by the transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    #[default]
    Empty,
    Text(String),
    Json(Value),
    Bytes(Bytes),
}

impl ResponseBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseBody::Empty)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// The normalized response record passed through hooks and formatting.
///
/// For streamed exchanges the body is always `Empty`; the bytes travel on a
/// separate stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status_code: u16,
    pub headers: Headers,
    pub body: ResponseBody,
    pub request_url: String,
    pub request_method: HttpMethod,
    pub from_cache: bool,
}

impl ResponseEnvelope {
    /// An envelope with no headers and no body.
    pub fn new(method: HttpMethod, url: impl Into<String>, status_code: u16) -> Self {
        Self {
            status_code,
            headers: Headers::new(),
            body: ResponseBody::Empty,
            request_url: url.into(),
            request_method: method,
            from_cache: false,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }
}
