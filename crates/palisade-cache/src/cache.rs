//! The response cache store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::key::CacheKey;

/// Result of [`ResponseCache::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The entry was stored, replacing any previous entry for the key.
    Stored,
    /// Caching is disabled; nothing was stored.
    Disabled,
    /// The store was full of live entries; the new entry was dropped.
    Full,
}

/// Snapshot of the cache for the admin surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Entries currently held, live or expired.
    pub total_entries: usize,
    /// Capacity bound.
    pub max_size: usize,
    /// Whether caching is enabled.
    pub enabled: bool,
    /// Default TTL in seconds.
    pub default_ttl_seconds: u64,
    /// Entries not yet expired.
    pub active_entries: usize,
    /// Entries expired but not yet removed.
    pub expired_entries: usize,
    /// Entry count per key prefix.
    pub route_breakdown: BTreeMap<String, usize>,
    /// Lookups that returned an entry.
    pub hits: u64,
    /// Lookups that returned nothing.
    pub misses: u64,
    /// Expired entries removed by any path.
    pub evictions: u64,
    /// Puts dropped because the store was full.
    pub rejected: u64,
}

/// Concurrent in-memory response cache.
///
/// Safe for concurrent use from many requests plus the background sweeper.
/// Writers for the same key race with last-writer-wins semantics.
#[derive(Debug)]
pub struct ResponseCache {
    config: CacheConfig,
    entries: RwLock<HashMap<CacheKey, Arc<CacheEntry>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    rejected: AtomicU64,
}

impl ResponseCache {
    /// Creates an empty cache.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Returns the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns true if caching is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Looks up a live entry.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        let found = self.entries.read().get(key).cloned();

        match found {
            Some(entry) if !entry.is_expired() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            Some(stale) => {
                let mut entries = self.entries.write();
                // A concurrent put may have refreshed the key meanwhile.
                if entries.get(key).is_some_and(|e| Arc::ptr_eq(e, &stale)) {
                    entries.remove(key);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Removed expired cache entry");
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores an entry.
    ///
    /// Replacing an existing key always succeeds. A new key arriving at a
    /// full store first triggers a sweep of expired entries; if the store is
    /// still full the new entry is dropped and no live entry is evicted.
    pub fn put(&self, key: CacheKey, entry: CacheEntry) -> PutOutcome {
        if !self.config.enabled {
            return PutOutcome::Disabled;
        }

        let mut entries = self.entries.write();

        if !entries.contains_key(&key) && entries.len() >= self.config.max_size {
            let removed = Self::retain_live(&mut entries);
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);

            if entries.len() >= self.config.max_size {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(
                    key = %key,
                    max_size = self.config.max_size,
                    "Cache full, response not cached"
                );
                return PutOutcome::Full;
            }
        }

        debug!(key = %key, ttl_seconds = entry.ttl_seconds(), "Cached response");
        entries.insert(key, Arc::new(entry));
        PutOutcome::Stored
    }

    /// Removes one entry. Returns true if it was present.
    pub fn evict(&self, key: &CacheKey) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Removes every entry whose key fully matches `pattern`.
    ///
    /// Returns the number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regular expression.
    pub fn evict_by_pattern(&self, pattern: &str) -> Result<usize, regex::Error> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))?;

        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !regex.is_match(key.as_str()));
        let removed = before - entries.len();

        debug!(pattern, removed, "Evicted cache entries by pattern");
        Ok(removed)
    }

    /// Removes every entry. Returns the number removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let removed = entries.len();
        entries.clear();
        removed
    }

    /// Removes every expired entry. Returns the number removed.
    pub fn evict_expired(&self) -> usize {
        let removed = Self::retain_live(&mut self.entries.write());
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Returns the number of entries held, including expired ones.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no entries are held.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns a statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();

        let mut expired_entries = 0;
        let mut route_breakdown = BTreeMap::new();
        for (key, entry) in entries.iter() {
            if entry.is_expired() {
                expired_entries += 1;
            }
            *route_breakdown.entry(key.prefix().to_string()).or_insert(0) += 1;
        }

        CacheStats {
            total_entries: entries.len(),
            max_size: self.config.max_size,
            enabled: self.config.enabled,
            default_ttl_seconds: self.config.default_ttl_seconds,
            active_entries: entries.len() - expired_entries,
            expired_entries,
            route_breakdown,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    fn retain_live(entries: &mut HashMap<CacheKey, Arc<CacheEntry>>) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }
}
