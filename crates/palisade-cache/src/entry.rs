//! Cached responses.

use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use tokio::time::Instant;

/// A captured backend response with its expiry.
///
/// Entries are immutable once created; a refresh replaces the entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Response status.
    pub status: StatusCode,
    /// Response headers as returned by the backend.
    pub headers: HeaderMap,
    /// Full response body.
    pub body: Bytes,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes, ttl_seconds: u64) -> Self {
        Self {
            status,
            headers,
            body,
            created_at: Instant::now(),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    /// Returns the configured TTL in seconds.
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl.as_secs()
    }

    /// Returns true once the entry has outlived its TTL.
    ///
    /// An entry read exactly at `created_at + ttl` is still live.
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }

    /// Returns the whole seconds left before expiry, zero when expired.
    pub fn remaining_ttl_seconds(&self) -> u64 {
        self.ttl.saturating_sub(self.created_at.elapsed()).as_secs()
    }

    /// Returns how long ago the entry was created.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ttl: u64) -> CacheEntry {
        CacheEntry::new(StatusCode::OK, HeaderMap::new(), Bytes::from_static(b"ok"), ttl)
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_boundary() {
        let entry = entry(10);
        assert!(!entry.is_expired());
        assert_eq!(entry.remaining_ttl_seconds(), 10);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!entry.is_expired());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(entry.is_expired());
        assert_eq!(entry.remaining_ttl_seconds(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_ttl_counts_down() {
        let entry = entry(60);
        tokio::time::advance(Duration::from_secs(15)).await;
        assert_eq!(entry.remaining_ttl_seconds(), 45);
        assert_eq!(entry.age(), Duration::from_secs(15));
        assert_eq!(entry.ttl_seconds(), 60);
    }
}
