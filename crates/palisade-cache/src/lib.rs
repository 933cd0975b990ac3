//! # Palisade Cache
//!
//! Local, in-memory cache of backend responses with per-entry TTL, a global
//! capacity bound and periodic background eviction.
//!
//! ## Eviction paths
//!
//! | Path | Trigger |
//! |------|---------|
//! | Lazy | [`ResponseCache::get`] finds an expired entry and removes it |
//! | Capacity sweep | [`ResponseCache::put`] finds the store full |
//! | Background sweep | [`CacheSweeper`] every `eviction_interval_seconds` |
//! | Explicit | [`ResponseCache::evict`], [`ResponseCache::evict_by_pattern`], [`ResponseCache::clear`] |
//!
//! A full store never evicts a live entry to make room: the new entry is
//! dropped instead.
//!
//! ## Example
//!
//! ```
//! use palisade_cache::{CacheConfig, CacheEntry, CacheKey, ResponseCache};
//! use http::{HeaderMap, Method, StatusCode};
//! use bytes::Bytes;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache = ResponseCache::new(CacheConfig::default());
//! let key = CacheKey::new(&Method::GET, "/api/products/7", None).unwrap();
//!
//! let entry = CacheEntry::new(StatusCode::OK, HeaderMap::new(), Bytes::from("{}"), 60);
//! cache.put(key.clone(), entry);
//!
//! assert!(cache.get(&key).is_some());
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/palisade-cache/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
pub mod entry;
pub mod key;
pub mod sweeper;

pub use cache::{CacheStats, PutOutcome, ResponseCache};
pub use config::CacheConfig;
pub use entry::CacheEntry;
pub use key::CacheKey;
pub use sweeper::CacheSweeper;
