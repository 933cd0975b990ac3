//! Request rate limiting.
//!
//! The filter resolves a key for the caller and asks a [`RateLimiter`] for a
//! decision. A deny short-circuits with 429 before authentication or caching
//! run.
//!
//! ## Key resolution
//!
//! 1. the verified identity (`user:<id>`, `subject:<sub>` or `client:<id>`)
//!    when authentication already ran
//! 2. `ip:<remote ip>` when the client address is known
//! 3. `anonymous`
//!
//! Client-supplied `X-Auth-*` headers never select the key.
//!
//! ## Response headers
//!
//! - `X-RateLimit-Remaining`
//! - `X-RateLimit-Burst-Capacity`
//! - `X-RateLimit-Replenish-Rate`
//! - `Retry-After` (429 only)

use crate::context::Exchange;
use crate::filter::{BoxFuture, Filter, GlobalFilter, Next};
use crate::filters::response_headers::harden_response_headers;
use crate::types::{Request, Response, ResponseExt};
use http::{HeaderMap, HeaderValue};
use palisade_core::{headers, GatewayError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Outcome of one rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Tokens left for this key after the check.
    pub remaining: u64,
    /// Seconds until a token is available, when denied.
    pub retry_after_seconds: u64,
}

/// Rate limiting backend.
pub trait RateLimiter: Send + Sync + 'static {
    /// Consumes one token for `key` if available.
    fn check<'a>(&'a self, key: &'a str) -> BoxFuture<'a, RateLimitDecision>;

    /// Maximum tokens a key can hold.
    fn burst_capacity(&self) -> u64;

    /// Tokens added per second.
    fn replenish_rate(&self) -> u64;
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

impl Bucket {
    fn refilled(&self, now: Instant, rate: f64, capacity: f64) -> f64 {
        let elapsed = now.duration_since(self.refilled_at).as_secs_f64();
        elapsed.mul_add(rate, self.tokens).min(capacity)
    }
}

/// Default bound on tracked keys.
pub const DEFAULT_MAX_KEYS: usize = 10_000;

/// In-memory token bucket per key.
///
/// At most `max_keys` buckets are kept. When a new key arrives at the bound,
/// buckets that have refilled to capacity are dropped first, since a fresh
/// bucket is identical; if none has, the least recently used one goes.
#[derive(Debug)]
pub struct TokenBucketLimiter {
    replenish_rate: u64,
    burst_capacity: u64,
    max_keys: usize,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl TokenBucketLimiter {
    /// Creates a limiter.
    ///
    /// A zero rate or capacity is raised to one.
    pub fn new(replenish_rate: u64, burst_capacity: u64) -> Self {
        Self {
            replenish_rate: replenish_rate.max(1),
            burst_capacity: burst_capacity.max(1),
            max_keys: DEFAULT_MAX_KEYS,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the bound on tracked keys.
    #[must_use]
    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = max_keys.max(1);
        self
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.lock().len()
    }

    /// Drops every bucket that has refilled to capacity.
    ///
    /// Returns the number of buckets removed.
    pub fn prune_idle(&self) -> usize {
        let mut buckets = self.buckets.lock();
        self.prune_full(&mut buckets, Instant::now())
    }

    #[allow(clippy::cast_precision_loss)]
    fn prune_full(&self, buckets: &mut HashMap<String, Bucket>, now: Instant) -> usize {
        let capacity = self.burst_capacity as f64;
        let rate = self.replenish_rate as f64;
        let before = buckets.len();
        buckets.retain(|_, bucket| bucket.refilled(now, rate, capacity) < capacity);
        before - buckets.len()
    }

    fn make_room(&self, buckets: &mut HashMap<String, Bucket>, now: Instant) {
        if buckets.len() < self.max_keys {
            return;
        }
        let pruned = self.prune_full(buckets, now);
        if buckets.len() >= self.max_keys {
            let oldest = buckets
                .iter()
                .min_by_key(|(_, bucket)| bucket.refilled_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                buckets.remove(&oldest);
            }
        }
        debug!(pruned, tracked = buckets.len(), "Rate limit buckets pruned");
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn take(&self, key: &str) -> RateLimitDecision {
        let now = Instant::now();
        let capacity = self.burst_capacity as f64;
        let rate = self.replenish_rate as f64;

        let mut buckets = self.buckets.lock();
        if !buckets.contains_key(key) {
            self.make_room(&mut buckets, now);
        }
        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: capacity,
            refilled_at: now,
        });

        bucket.tokens = bucket.refilled(now, rate, capacity);
        bucket.refilled_at = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            RateLimitDecision {
                allowed: true,
                remaining: bucket.tokens.floor() as u64,
                retry_after_seconds: 0,
            }
        } else {
            let wait = ((1.0 - bucket.tokens) / rate).ceil().max(1.0);
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                retry_after_seconds: wait as u64,
            }
        }
    }
}

impl Default for TokenBucketLimiter {
    fn default() -> Self {
        Self::new(10, 20)
    }
}

impl RateLimiter for TokenBucketLimiter {
    fn check<'a>(&'a self, key: &'a str) -> BoxFuture<'a, RateLimitDecision> {
        let decision = self.take(key);
        Box::pin(async move { decision })
    }

    fn burst_capacity(&self) -> u64 {
        self.burst_capacity
    }

    fn replenish_rate(&self) -> u64 {
        self.replenish_rate
    }
}

/// Global filter enforcing a [`RateLimiter`].
#[derive(Clone)]
pub struct RateLimitFilter {
    limiter: Arc<dyn RateLimiter>,
}

impl std::fmt::Debug for RateLimitFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitFilter")
            .field("burst_capacity", &self.limiter.burst_capacity())
            .field("replenish_rate", &self.limiter.replenish_rate())
            .finish()
    }
}

impl RateLimitFilter {
    /// Creates the filter over a limiter.
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self { limiter }
    }

    /// Resolves the rate limit key for a request.
    pub fn resolve_key(exchange: &Exchange) -> String {
        let identity = exchange.identity();
        if identity.is_authenticated() {
            return identity.log_id();
        }
        if let Some(addr) = exchange.remote_addr() {
            return format!("ip:{}", addr.ip());
        }
        "anonymous".to_string()
    }

    fn quota_headers(&self, target: &mut HeaderMap, remaining: u64) {
        target.insert(headers::RATE_LIMIT_REMAINING.clone(), HeaderValue::from(remaining));
        target.insert(
            headers::RATE_LIMIT_BURST_CAPACITY.clone(),
            HeaderValue::from(self.limiter.burst_capacity()),
        );
        target.insert(
            headers::RATE_LIMIT_REPLENISH_RATE.clone(),
            HeaderValue::from(self.limiter.replenish_rate()),
        );
    }
}

impl Filter for RateLimitFilter {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let key = Self::resolve_key(exchange);
            let decision = self.limiter.check(&key).await;

            if !decision.allowed {
                warn!(
                    correlation_id = %exchange.correlation_id(),
                    key = %key,
                    retry_after = decision.retry_after_seconds,
                    "Rate limit exceeded"
                );
                let error = GatewayError::rate_limited(decision.retry_after_seconds);
                let mut response = Response::gateway_error(&error, exchange.path());
                self.quota_headers(response.headers_mut(), 0);
                harden_response_headers(response.headers_mut());
                return response;
            }

            let mut response = next.run(exchange, request).await;
            self.quota_headers(response.headers_mut(), decision.remaining);
            response
        })
    }
}

impl GlobalFilter for RateLimitFilter {
    fn order(&self) -> i32 {
        -100
    }
}
