//! Response caching for `GET` routes.
//!
//! ## Hit
//!
//! The stored status, headers and body are returned with `X-Cache: HIT` and
//! `X-Cache-TTL: <remaining seconds>`. Nothing after this filter runs.
//!
//! ## Miss
//!
//! The request continues. Once the response is back, a 2xx with a body no
//! larger than `max_body_size` is stored under the request's key. The caller
//! gets the response exactly as produced; it carries no `X-Cache` header.

use crate::context::Exchange;
use crate::filter::{BoxFuture, Filter, Next};
use crate::types::{Request, Response};
use bytes::Bytes;
use http::HeaderValue;
use http_body_util::{BodyExt, Full};
use palisade_cache::{CacheEntry, CacheKey, PutOutcome, ResponseCache};
use palisade_core::headers;
use palisade_telemetry::metrics::record_cache_lookup;
use std::sync::Arc;
use tracing::debug;

/// Route filter backed by the shared [`ResponseCache`].
#[derive(Debug, Clone)]
pub struct ResponseCacheFilter {
    cache: Arc<ResponseCache>,
    route_id: String,
    ttl_seconds: u64,
}

impl ResponseCacheFilter {
    /// Creates the filter for one route.
    ///
    /// TTL resolution: a positive `ttl_override`, else the route's configured
    /// TTL, else the cache default.
    pub fn new(cache: Arc<ResponseCache>, route_id: impl Into<String>, ttl_override: Option<u64>) -> Self {
        let route_id = route_id.into();
        let ttl_seconds = ttl_override
            .filter(|ttl| *ttl > 0)
            .unwrap_or_else(|| cache.config().ttl_for_route(&route_id));

        Self {
            cache,
            route_id,
            ttl_seconds,
        }
    }

    /// TTL applied to entries stored by this filter.
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    fn hit_response(entry: &CacheEntry) -> Response {
        let mut response = http::Response::new(Full::new(entry.body.clone()));
        *response.status_mut() = entry.status;
        *response.headers_mut() = entry.headers.clone();

        let response_headers = response.headers_mut();
        response_headers.insert(headers::CACHE.clone(), HeaderValue::from_static("HIT"));
        response_headers.insert(
            headers::CACHE_TTL.clone(),
            HeaderValue::from(entry.remaining_ttl_seconds()),
        );
        response
    }

    /// Stores a successful response and hands back an identical one.
    async fn capture(&self, key: CacheKey, response: Response) -> Response {
        let (parts, body) = response.into_parts();
        let body: Bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };

        if body.len() > self.cache.config().max_body_size {
            debug!(
                key = key.as_str(),
                size = body.len(),
                "Response body too large to cache"
            );
        } else {
            let entry = CacheEntry::new(parts.status, parts.headers.clone(), body.clone(), self.ttl_seconds);
            if self.cache.put(key.clone(), entry) == PutOutcome::Stored {
                debug!(key = key.as_str(), ttl = self.ttl_seconds, "Response cached");
            }
        }

        http::Response::from_parts(parts, Full::new(body))
    }
}

impl Filter for ResponseCacheFilter {
    fn name(&self) -> &'static str {
        "response_cache"
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if !self.cache.is_enabled() {
                return next.run(exchange, request).await;
            }
            let Some(key) = CacheKey::for_request(&request) else {
                return next.run(exchange, request).await;
            };

            if let Some(entry) = self.cache.get(&key) {
                record_cache_lookup(&self.route_id, true);
                debug!(
                    correlation_id = %exchange.correlation_id(),
                    key = key.as_str(),
                    "Cache hit"
                );
                return Self::hit_response(&entry);
            }

            record_cache_lookup(&self.route_id, false);
            debug!(
                correlation_id = %exchange.correlation_id(),
                key = key.as_str(),
                "Cache miss"
            );

            let response = next.run(exchange, request).await;
            if response.status().is_success() {
                self.capture(key, response).await
            } else {
                response
            }
        })
    }
}
