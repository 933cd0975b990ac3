//! Configuration for the response cache.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the response cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether caching is enabled at all.
    pub enabled: bool,
    /// TTL used when neither the filter nor the route overrides it.
    pub default_ttl_seconds: u64,
    /// Maximum number of entries held at once.
    pub max_size: usize,
    /// Per-route TTL overrides, keyed by route id.
    pub route_ttl: HashMap<String, u64>,
    /// Interval between background sweeps of expired entries.
    pub eviction_interval_seconds: u64,
    /// Responses with a larger body are passed through uncached.
    pub max_body_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_seconds: 60,
            max_size: 1000,
            route_ttl: HashMap::new(),
            eviction_interval_seconds: 30,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl CacheConfig {
    /// Disable caching.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set the default TTL.
    #[must_use]
    pub fn with_default_ttl(mut self, seconds: u64) -> Self {
        self.default_ttl_seconds = seconds;
        self
    }

    /// Set the maximum number of entries.
    #[must_use]
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Override the TTL for one route.
    #[must_use]
    pub fn with_route_ttl(mut self, route_id: impl Into<String>, seconds: u64) -> Self {
        self.route_ttl.insert(route_id.into(), seconds);
        self
    }

    /// Returns the TTL for a route, falling back to the default.
    pub fn ttl_for_route(&self, route_id: &str) -> u64 {
        self.route_ttl
            .get(route_id)
            .copied()
            .unwrap_or(self.default_ttl_seconds)
    }

    /// Returns the background sweep interval.
    ///
    /// Never zero; a configured zero is treated as one second.
    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_seconds.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.default_ttl_seconds, 60);
        assert_eq!(config.max_size, 1000);
        assert_eq!(config.eviction_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_route_ttl_fallback() {
        let config = CacheConfig::default().with_route_ttl("product-service", 300);
        assert_eq!(config.ttl_for_route("product-service"), 300);
        assert_eq!(config.ttl_for_route("user-service"), 60);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = CacheConfig {
            eviction_interval_seconds: 0,
            ..CacheConfig::default()
        };
        assert_eq!(config.eviction_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_json() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"max_size": 5, "route_ttl": {"a": 10}}"#).unwrap();
        assert_eq!(config.max_size, 5);
        assert_eq!(config.ttl_for_route("a"), 10);
        assert!(config.enabled);
    }
}
