//! Response cache capability and the transport decorator that applies it.
//!
//! Only buffered GET requests are cached, keyed by method, URL and query.
//! A request opts out with the `cache: false` directive. Entries are stored
//! only for 2xx responses and served back with `from_cache` set.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::TransportError;
use crate::http::{HttpMethod, RequestDescriptor, ResponseEnvelope};
use crate::transport::{StreamHandle, Transport};

/// Pluggable cache keyed by request identity.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<ResponseEnvelope>;
    fn set(&self, key: &str, value: ResponseEnvelope, ttl: Duration);
}

/// In-process cache with per-entry expiry.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, (Instant, ResponseEnvelope)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<ResponseEnvelope> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            let (expires_at, envelope) = entry.value();
            if *expires_at > now {
                return Some(envelope.clone());
            }
        }
        self.entries.remove_if(key, |_, (expires_at, _)| *expires_at <= now);
        None
    }

    /// Expired entries for other keys are swept on every insert.
    fn set(&self, key: &str, value: ResponseEnvelope, ttl: Duration) {
        let now = Instant::now();
        self.entries.retain(|_, (expires_at, _)| *expires_at > now);
        self.entries.insert(key.to_string(), (now + ttl, value));
    }
}

/// Identity of a request for caching purposes.
///
/// The query map is appended as JSON so delimiter characters inside keys or
/// values cannot make two different queries collide.
pub fn cache_key(request: &RequestDescriptor) -> String {
    let mut key = format!("{} {}", request.method, request.url);
    if !request.options.query.is_empty() {
        let query = serde_json::to_string(&request.options.query).unwrap_or_default();
        key.push(' ');
        key.push_str(&query);
    }
    key
}

/// Wraps a transport with a response cache.
pub struct CachingTransport<T> {
    inner: T,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl<T: Transport> CachingTransport<T> {
    /// `ttl` applies to requests without a `cacheTtl` option.
    pub fn new(inner: T, cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    fn cacheable(request: &RequestDescriptor) -> bool {
        request.method == HttpMethod::Get && !request.is_stream() && request.options.cache != Some(false)
    }
}

#[async_trait]
impl<T: Transport> Transport for CachingTransport<T> {
    async fn request(&self, request: RequestDescriptor) -> Result<ResponseEnvelope, TransportError> {
        if !Self::cacheable(&request) {
            return self.inner.request(request).await;
        }

        let key = cache_key(&request);
        if let Some(mut hit) = self.cache.get(&key) {
            tracing::debug!(%key, "serving response from cache");
            hit.from_cache = true;
            return Ok(hit);
        }

        let ttl = request.options.cache_ttl.map_or(self.ttl, Duration::from_millis);
        let envelope = self.inner.request(request).await?;
        if (200..300).contains(&envelope.status_code) {
            self.cache.set(&key, envelope.clone(), ttl);
        }
        Ok(envelope)
    }

    fn stream(&self, request: RequestDescriptor) -> StreamHandle {
        self.inner.stream(request)
    }
}
