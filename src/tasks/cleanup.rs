//! Cache Sweeper
//!
//! Background task that periodically removes expired entries from both
//! cache tiers.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{Clock, RequestCache};
use crate::storage::DurableStore;

/// Handle to a running sweep loop.
///
/// The loop runs until `stop` is called; dropping the handle leaves it
/// running for the life of the runtime.
#[derive(Debug)]
pub struct Sweeper {
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawns a task calling `cache.cleanup()` every `interval`.
    ///
    /// Returns `None` without spawning when the cache's durable store
    /// reports itself unavailable. Must be called from within a tokio runtime.
    ///
    /// # Example
    /// ```ignore
    /// let cache = Arc::new(RequestCache::from_config(MemoryStorage::new(), &config));
    /// let sweeper = Sweeper::start(cache.clone(), config.cleanup_interval());
    /// // Later, during shutdown:
    /// if let Some(sweeper) = sweeper { sweeper.stop(); }
    /// ```
    pub fn start<S, C>(cache: Arc<RequestCache<S, C>>, interval: Duration) -> Option<Self>
    where
        S: DurableStore + 'static,
        C: Clock + 'static,
    {
        if !cache.storage().is_available() {
            info!("Durable storage unavailable, cache sweeper not started");
            return None;
        }

        let handle = tokio::spawn(async move {
            info!("Starting cache sweeper with interval of {:?}", interval);

            loop {
                // Sleep for the configured interval
                tokio::time::sleep(interval).await;

                let report = cache.cleanup();

                // Log sweep statistics
                if report.total() > 0 {
                    info!(
                        "Cache sweep: removed {} memory and {} durable entries",
                        report.memory_removed, report.durable_removed
                    );
                } else {
                    debug!("Cache sweep: no expired entries found");
                }
            }
        });

        Some(Self { handle })
    }

    /// Aborts the sweep loop.
    pub fn stop(self) {
        self.handle.abort();
        info!("Cache sweeper stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheOptions, CacheSettings, ManualClock};
    use crate::storage::{MemoryStorage, NoopStorage};

    const INTERVAL: Duration = Duration::from_secs(600);

    type SharedCache = Arc<RequestCache<MemoryStorage, ManualClock>>;

    fn create_cache() -> (SharedCache, MemoryStorage, ManualClock) {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(1_700_000_000_000);
        let cache = RequestCache::new(storage.clone(), clock.clone(), CacheSettings::default());
        (Arc::new(cache), storage, clock)
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_expired_entries() {
        let (cache, storage, clock) = create_cache();
        cache.set("expire_soon", &"value", CacheOptions::with_ttl(Duration::from_secs(1)));

        let sweeper = Sweeper::start(cache.clone(), INTERVAL).expect("storage is available");

        clock.advance(2_000);
        tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;

        assert_eq!(cache.memory_len(), 0, "Expired entry should have been swept");
        assert!(storage.is_empty());

        sweeper.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_waits_for_interval() {
        let (cache, _, clock) = create_cache();
        cache.set("k", &1, CacheOptions::with_ttl(Duration::from_secs(1)));

        let sweeper = Sweeper::start(cache.clone(), INTERVAL).expect("storage is available");

        clock.advance(2_000);
        tokio::time::sleep(INTERVAL - Duration::from_secs(1)).await;

        // Expired but not yet swept
        assert!(cache.in_memory("k"));

        sweeper.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_preserves_valid_entries() {
        let (cache, _, clock) = create_cache();
        cache.set("long_lived", &"value", CacheOptions::with_ttl(Duration::from_secs(3600)));

        let sweeper = Sweeper::start(cache.clone(), INTERVAL).expect("storage is available");

        clock.advance(1_000);
        tokio::time::sleep(INTERVAL * 2).await;

        assert_eq!(cache.get::<String>("long_lived").as_deref(), Some("value"));

        sweeper.stop();
    }

    #[tokio::test]
    async fn test_sweeper_not_started_without_storage() {
        let cache = Arc::new(RequestCache::new(
            NoopStorage,
            ManualClock::new(0),
            CacheSettings::default(),
        ));

        assert!(Sweeper::start(cache, INTERVAL).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_sweeper_no_longer_sweeps() {
        let (cache, storage, clock) = create_cache();

        let sweeper = Sweeper::start(cache.clone(), INTERVAL).expect("storage is available");
        assert!(sweeper.is_running());
        sweeper.stop();

        cache.set("k", &1, CacheOptions::with_ttl(Duration::from_secs(1)));
        clock.advance(2_000);
        tokio::time::sleep(INTERVAL * 3).await;

        // Expired entries stay put until someone sweeps
        assert!(cache.in_memory("k"));
        assert_eq!(storage.len(), 1);
        assert_eq!(cache.cleanup().total(), 2);
    }
}
