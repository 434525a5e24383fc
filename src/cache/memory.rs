//! Memory Tier Module
//!
//! Bounded in-process map with oldest-timestamp eviction.

use std::collections::HashMap;

use crate::cache::CacheEntry;

// == Memory Tier ==
/// In-memory entries bounded at `max_entries`.
///
/// Eviction picks the entry with the smallest `timestamp`, i.e. the one
/// created or promoted first. Reads never refresh that timestamp, so this is
/// FIFO by creation, not LRU.
#[derive(Debug)]
pub struct MemoryTier {
    entries: HashMap<String, CacheEntry>,
    max_entries: usize,
}

impl MemoryTier {
    // == Constructor ==
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(max_entries),
            max_entries,
        }
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    // == Insert ==
    /// Stores `entry` under `key`, returning the key evicted to make room.
    ///
    /// Replacing an existing key never evicts. A tier sized at zero holds
    /// nothing.
    pub fn insert(&mut self, key: String, entry: CacheEntry) -> Option<String> {
        if self.max_entries == 0 {
            return None;
        }

        let mut evicted = None;
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            if let Some(oldest) = self.oldest_key() {
                self.entries.remove(&oldest);
                evicted = Some(oldest);
            }
        }

        self.entries.insert(key, entry);
        evicted
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // == Remove Expired ==
    /// Drops every entry with `expires_at <= now_ms`, returning how many went.
    pub fn remove_expired(&mut self, now_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now_ms));
        before - self.entries.len()
    }

    fn oldest_key(&self) -> Option<String> {
        self.entries
            .iter()
            .min_by_key(|(_, entry)| entry.timestamp)
            .map(|(key, _)| key.clone())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
