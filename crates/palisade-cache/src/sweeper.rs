//! Background removal of expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::ResponseCache;

/// Periodic task that removes expired entries from a [`ResponseCache`].
///
/// Started at gateway startup and stopped during graceful shutdown.
#[derive(Debug)]
pub struct CacheSweeper {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl CacheSweeper {
    /// Spawns the sweeper on the current runtime.
    pub fn start(cache: Arc<ResponseCache>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            info!(interval_secs = interval.as_secs(), "Cache sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.evict_expired();
                        if removed > 0 {
                            debug!(removed, remaining = cache.len(), "Swept expired cache entries");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Cache sweeper stopping");
                        break;
                    }
                }
            }
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Returns true while the background task is alive.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stops the sweeper and waits for the task to exit.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheConfig, CacheEntry, CacheKey};
    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode};

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_expired_entries() {
        let cache = Arc::new(ResponseCache::new(CacheConfig::default()));
        let short = CacheKey::new(&Method::GET, "/short", None).unwrap();
        let long = CacheKey::new(&Method::GET, "/long", None).unwrap();
        cache.put(short, CacheEntry::new(StatusCode::OK, HeaderMap::new(), Bytes::new(), 1));
        cache.put(long, CacheEntry::new(StatusCode::OK, HeaderMap::new(), Bytes::new(), 600));

        let sweeper = CacheSweeper::start(cache.clone(), Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(6)).await;

        // Removed without any lookup touching the key.
        assert_eq!(cache.len(), 1);
        assert!(sweeper.is_running());

        sweeper.stop().await;
    }

    #[tokio::test]
    async fn test_sweeper_stops() {
        let cache = Arc::new(ResponseCache::new(CacheConfig::default()));
        let sweeper = CacheSweeper::start(cache, Duration::from_secs(30));
        sweeper.stop().await;
    }
}
