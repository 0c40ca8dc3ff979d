//! Turns per-verb call arguments into a single `RequestDescriptor`.
//!
//! Options arrive as loosely-typed JSON (action params, settings files) or
//! already typed. Either way the normalizer never fails: anything that is not
//! a key-value map becomes an empty one, recognized keys with unusable values
//! are dropped, and the verb always overwrites whatever `method` the caller
//! supplied. URL validation is left to the transport.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::http::{HttpMethod, RequestDescriptor, RequestOptions};
use crate::transport::ByteStream;

/// Build a descriptor from JSON options.
pub fn normalize(
    method: HttpMethod,
    url: impl Into<String>,
    options: Option<Value>,
    payload: Option<ByteStream>,
) -> RequestDescriptor {
    let options = options.map(coerce_options).unwrap_or_default();
    normalize_options(method, url, options, payload)
}

/// Build a descriptor from already-typed options.
///
/// A payload implies streaming for body-bearing verbs and is discarded for
/// GET and DELETE, so `payload.is_some()` always matches `is_upload()`.
pub fn normalize_options(
    method: HttpMethod,
    url: impl Into<String>,
    mut options: RequestOptions,
    mut payload: Option<ByteStream>,
) -> RequestDescriptor {
    options.method = Some(method);
    if payload.is_some() {
        if method.carries_body() {
            options.is_stream = true;
        } else {
            tracing::debug!(%method, "dropping stream payload for a verb without a request body");
            payload = None;
        }
    }
    RequestDescriptor {
        id: Uuid::new_v4(),
        url: url.into(),
        method,
        options,
        payload,
    }
}

/// Lift a JSON value into `RequestOptions`.
///
/// Non-objects become empty options. `stream` is accepted as a legacy alias
/// of `isStream`; both use JavaScript-style truthiness.
pub fn coerce_options(value: Value) -> RequestOptions {
    let Value::Object(map) = value else {
        return RequestOptions::default();
    };
    from_map(map)
}

fn from_map(map: Map<String, Value>) -> RequestOptions {
    let mut options = RequestOptions::default();
    for (key, value) in map {
        match key.as_str() {
            // Overwritten by the verb in `normalize_options`.
            "method" => {}
            "headers" => {
                if let Some(headers) = lift(&key, value) {
                    options.headers = headers;
                }
            }
            "query" | "searchParams" => {
                if let Some(query) = lift_query(value) {
                    options.query = query;
                }
            }
            "json" => {
                if !value.is_null() {
                    options.json = Some(value);
                }
            }
            "body" => match value {
                Value::String(body) => options.body = Some(body),
                Value::Null => {}
                other => options.json = options.json.take().or(Some(other)),
            },
            "responseType" => options.response_type = lift(&key, value),
            "timeout" => options.timeout = lift(&key, value),
            "isStream" | "stream" => options.is_stream |= is_truthy(&value),
            "cache" => options.cache = Some(is_truthy(&value)),
            "cacheTtl" => options.cache_ttl = lift(&key, value),
            "throwHttpErrors" => options.throw_http_errors = Some(is_truthy(&value)),
            _ => {
                options.extra.insert(key, value);
            }
        }
    }
    options
}

fn lift<T: DeserializeOwned>(key: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(err) => {
            tracing::debug!(option = key, error = %err, "ignoring unusable request option");
            None
        }
    }
}

/// Query values may be strings, numbers or booleans; everything is sent as text.
fn lift_query(value: Value) -> Option<std::collections::BTreeMap<String, String>> {
    let Value::Object(map) = value else {
        return None;
    };
    let query = map
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(s) => Some((key, s)),
            Value::Number(n) => Some((key, n.to_string())),
            Value::Bool(b) => Some((key, b.to_string())),
            _ => None,
        })
        .collect();
    Some(query)
}

/// JavaScript truthiness for option flags.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
