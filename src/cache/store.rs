//! Request Cache Module
//!
//! Main cache engine: a bounded memory tier in front of a prefixed namespace
//! of a durable store, with TTL expiry and ETag bookkeeping.
//!
//! The two tiers are not transactionally linked. Memory holds a copy of, or
//! something newer than, the durable entry; a memory miss is repaired from
//! the durable tier on read.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheStats, Clock, MemoryTier, SystemClock};
use crate::config::{Config, DEFAULT_KEY_PREFIX, DEFAULT_MAX_MEMORY_SIZE, DEFAULT_TTL_MS};
use crate::storage::DurableStore;

/// Pressure relief drops one in every `PRESSURE_RELIEF_DIVISOR` prefixed
/// entries (20%), rounded up.
const PRESSURE_RELIEF_DIVISOR: usize = 5;

// == Cache Options ==
/// Per-write options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Overrides the cache's default TTL
    pub ttl: Option<Duration>,
    /// Accepted for API compatibility; storage behaves the same either way
    pub use_http_cache: bool,
}

impl CacheOptions {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::default()
        }
    }
}

// == Cache Settings ==
/// Construction parameters for a `RequestCache`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub max_memory_size: usize,
    pub default_ttl_ms: u64,
    pub key_prefix: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_memory_size: DEFAULT_MAX_MEMORY_SIZE,
            default_ttl_ms: DEFAULT_TTL_MS,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl From<&Config> for CacheSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_memory_size: config.max_memory_size,
            default_ttl_ms: config.default_ttl_ms,
            key_prefix: config.key_prefix.clone(),
        }
    }
}

// == Cleanup Report ==
/// Entries removed by one `cleanup` sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub memory_removed: usize,
    pub durable_removed: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.memory_removed + self.durable_removed
    }
}

#[derive(Debug)]
struct Inner {
    memory: MemoryTier,
    stats: CacheStats,
}

impl Inner {
    fn insert(&mut self, key: &str, entry: CacheEntry) {
        if let Some(evicted) = self.memory.insert(key.to_string(), entry) {
            self.stats.record_eviction();
            debug!("Evicted oldest memory entry: {}", evicted);
        }
    }
}

// == Request Cache ==
/// Two-tier cache for JSON payloads.
///
/// All methods take `&self`; wrap the cache in an `Arc` to share it. Apart
/// from `fetch`, every operation is synchronous and never fails: storage
/// faults are logged and the cache degrades to memory-only for that key.
pub struct RequestCache<S, C = SystemClock> {
    inner: Mutex<Inner>,
    storage: S,
    clock: C,
    key_prefix: String,
    default_ttl_ms: u64,
}

impl<S: DurableStore> RequestCache<S, SystemClock> {
    /// Creates a cache on the wall clock with parameters from `config`.
    pub fn from_config(storage: S, config: &Config) -> Self {
        Self::new(storage, SystemClock, CacheSettings::from(config))
    }
}

impl<S: DurableStore, C: Clock> RequestCache<S, C> {
    // == Constructor ==
    pub fn new(storage: S, clock: C, settings: CacheSettings) -> Self {
        Self {
            inner: Mutex::new(Inner {
                memory: MemoryTier::new(settings.max_memory_size),
                stats: CacheStats::new(),
            }),
            storage,
            clock,
            key_prefix: settings.key_prefix,
            default_ttl_ms: settings.default_ttl_ms,
        }
    }

    // == Get ==
    /// Returns the fresh payload for `key`.
    ///
    /// Memory is checked first; a stale memory entry is dropped (memory
    /// only) and the durable tier consulted. A fresh durable entry is
    /// promoted into memory, a stale one is removed. Unreadable durable
    /// entries and payloads of the wrong shape count as misses.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = self.clock.now_ms();
        let mut inner = self.lock();

        if let Some(entry) = inner.memory.get(key) {
            if !entry.is_expired_at(now) {
                let data = entry.data_as::<T>();
                if data.is_some() {
                    inner.stats.record_hit();
                    debug!("Memory hit: {}", key);
                } else {
                    inner.stats.record_miss();
                    debug!("Cached payload for {} does not match the requested type", key);
                }
                return data;
            }
            inner.memory.remove(key);
            debug!("Memory entry expired: {}", key);
        }

        let storage_key = self.storage_key(key);
        let Some(entry) = self.read_durable(&storage_key) else {
            inner.stats.record_miss();
            return None;
        };

        if entry.is_expired_at(now) {
            self.remove_durable(&storage_key);
            inner.stats.record_miss();
            debug!("Durable entry expired: {}", key);
            return None;
        }

        let Some(data) = entry.data_as::<T>() else {
            inner.stats.record_miss();
            debug!("Cached payload for {} does not match the requested type", key);
            return None;
        };

        inner.insert(key, entry);
        inner.stats.record_durable_hit();
        debug!("Durable hit, promoted into memory: {}", key);
        Some(data)
    }

    // == Set ==
    /// Stores `data` under `key` in both tiers.
    ///
    /// The memory write always happens. If the durable write fails the
    /// oldest prefixed durable entries are pruned; the failed write is not
    /// retried.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, data: &T, options: CacheOptions) {
        self.write(key, data, None, options);
    }

    /// Same as `set`, recording the validator the origin sent with `data`.
    pub fn set_with_etag<T: Serialize + ?Sized>(
        &self,
        key: &str,
        data: &T,
        etag: &str,
        options: CacheOptions,
    ) {
        self.write(key, data, Some(etag.to_string()), options);
    }

    fn write<T: Serialize + ?Sized>(
        &self,
        key: &str,
        data: &T,
        etag: Option<String>,
        options: CacheOptions,
    ) {
        let value = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                warn!("Not caching {}: payload is not JSON-serializable: {}", key, e);
                return;
            }
        };

        let ttl_ms = options.ttl.map_or(self.default_ttl_ms, duration_ms);
        let entry = CacheEntry::new(value, self.clock.now_ms(), ttl_ms, etag);
        let encoded = entry.encode();

        let mut inner = self.lock();
        inner.insert(key, entry);

        let raw = match encoded {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to encode entry {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.storage.set_item(&self.storage_key(key), &raw) {
            warn!("Durable write failed for {}: {}", key, e);
            inner.stats.record_pressure_relief();
            self.relieve_pressure();
        }
    }

    // == Get ETag ==
    /// Returns the validator stored for `key`, fresh or not.
    ///
    /// Memory wins when it holds the key; nothing is promoted.
    pub fn get_etag(&self, key: &str) -> Option<String> {
        self.peek(key).and_then(|entry| entry.etag)
    }

    /// Raw entry for `key` from memory, then the durable tier, without
    /// freshness checks or side effects.
    pub(crate) fn peek(&self, key: &str) -> Option<CacheEntry> {
        if let Some(entry) = self.lock().memory.get(key) {
            return Some(entry.clone());
        }
        self.read_durable(&self.storage_key(key))
    }

    // == Clear ==
    /// Removes `key` from both tiers.
    pub fn clear(&self, key: &str) {
        let mut inner = self.lock();
        inner.memory.remove(key);
        self.remove_durable(&self.storage_key(key));
        debug!("Cleared {}", key);
    }

    /// Empties memory and removes every durable key under the cache prefix.
    /// Keys outside the prefix are left alone.
    pub fn clear_all(&self) {
        let mut inner = self.lock();
        inner.memory.clear();

        let removed = self.remove_durable_batch(&self.prefixed_keys());
        info!("Cache cleared: {} durable entries removed", removed);
    }

    /// Drops the memory tier only, as a process restart would.
    pub fn clear_memory(&self) {
        self.lock().memory.clear();
    }

    // == Cleanup ==
    /// Sweeps expired entries from both tiers.
    ///
    /// Durable entries that cannot be parsed are treated as expired.
    pub fn cleanup(&self) -> CleanupReport {
        let now = self.clock.now_ms();
        let mut inner = self.lock();

        let memory_removed = inner.memory.remove_expired(now);

        let expired: Vec<String> = self
            .prefixed_keys()
            .into_iter()
            .filter(|storage_key| {
                let Some(raw) = self.storage.get_item(storage_key) else {
                    return false;
                };
                match CacheEntry::decode(&raw) {
                    Ok(entry) => entry.is_expired_at(now),
                    Err(e) => {
                        warn!("Removing unreadable durable entry {}: {}", storage_key, e);
                        true
                    }
                }
            })
            .collect();
        let durable_removed = self.remove_durable_batch(&expired);

        drop(inner);
        CleanupReport {
            memory_removed,
            durable_removed,
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.memory.len());
        stats
    }

    /// Number of entries currently in the memory tier.
    pub fn memory_len(&self) -> usize {
        self.lock().memory.len()
    }

    /// Whether the memory tier currently holds `key`, fresh or not.
    pub fn in_memory(&self, key: &str) -> bool {
        self.lock().memory.contains_key(key)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    // == Durable Tier Helpers ==
    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    fn prefixed_keys(&self) -> Vec<String> {
        self.storage
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(&self.key_prefix))
            .collect()
    }

    fn read_durable(&self, storage_key: &str) -> Option<CacheEntry> {
        let raw = self.storage.get_item(storage_key)?;
        match CacheEntry::decode(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Unreadable durable entry {}: {}", storage_key, e);
                None
            }
        }
    }

    fn remove_durable(&self, storage_key: &str) {
        if let Err(e) = self.storage.remove_item(storage_key) {
            warn!("Failed to remove durable entry {}: {}", storage_key, e);
        }
    }

    /// Removes `storage_keys` in one batch, returning how many went.
    fn remove_durable_batch(&self, storage_keys: &[String]) -> usize {
        if storage_keys.is_empty() {
            return 0;
        }
        match self.storage.remove_items(storage_keys) {
            Ok(()) => storage_keys.len(),
            Err(e) => {
                warn!("Failed to remove {} durable entries: {}", storage_keys.len(), e);
                0
            }
        }
    }

    /// Drops the oldest 20% (at least one) of the prefixed durable entries,
    /// ordered by `timestamp`. Unreadable entries are skipped.
    fn relieve_pressure(&self) -> usize {
        let mut stamped: Vec<(u64, String)> = self
            .prefixed_keys()
            .into_iter()
            .filter_map(|key| {
                let raw = self.storage.get_item(&key)?;
                let entry = CacheEntry::decode(&raw).ok()?;
                Some((entry.timestamp, key))
            })
            .collect();

        if stamped.is_empty() {
            return 0;
        }

        stamped.sort_by_key(|(timestamp, _)| *timestamp);
        let target = stamped.len().div_ceil(PRESSURE_RELIEF_DIVISOR).max(1);

        let oldest: Vec<String> = stamped
            .iter()
            .take(target)
            .map(|(_, key)| key.clone())
            .collect();
        let removed = self.remove_durable_batch(&oldest);
        warn!(
            "Durable storage under pressure: removed {} of {} entries",
            removed,
            stamped.len()
        );
        removed
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn duration_ms(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}
