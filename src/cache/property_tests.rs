//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache's observable guarantees over generated
//! keys, payloads and clock movements.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;

use crate::cache::{CacheOptions, CacheSettings, ManualClock, RequestCache};
use crate::storage::{DurableStore, MemoryStorage};

// == Test Configuration ==
const START: u64 = 1_700_000_000_000;
const TEST_MAX_MEMORY: usize = 8;

type TestCache = RequestCache<MemoryStorage, ManualClock>;

fn create_cache(max_memory_size: usize) -> (TestCache, MemoryStorage, ManualClock) {
    let storage = MemoryStorage::new();
    let clock = ManualClock::new(START);
    let settings = CacheSettings {
        max_memory_size,
        ..CacheSettings::default()
    };
    let cache = RequestCache::new(storage.clone(), clock.clone(), settings);
    (cache, storage, clock)
}

// == Strategies ==
/// Generates cache keys shaped like endpoint paths
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9_/]{1,32}"
}

/// Generates JSON payloads up to a few levels deep
fn payload_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,24}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..6)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Storing then reading before expiry returns a deep-equal payload
    #[test]
    fn prop_roundtrip_storage(key in key_strategy(), payload in payload_strategy()) {
        let (cache, _, _) = create_cache(TEST_MAX_MEMORY);

        cache.set(&key, &payload, CacheOptions::default());
        prop_assert_eq!(cache.get::<Value>(&key), Some(payload.clone()));

        // The durable copy round-trips as well
        cache.clear_memory();
        prop_assert_eq!(cache.get::<Value>(&key), Some(payload));
    }

    // Reads strictly before `ttl` elapses hit; reads at or after it miss
    #[test]
    fn prop_ttl_expiry(
        key in key_strategy(),
        ttl_ms in 1u64..1_000_000,
        probe in 0u64..2_000_000,
    ) {
        let (cache, _, clock) = create_cache(TEST_MAX_MEMORY);

        cache.set(&key, &json!("v"), CacheOptions::with_ttl(Duration::from_millis(ttl_ms)));
        clock.advance(probe);

        let hit = cache.get::<Value>(&key).is_some();
        prop_assert_eq!(hit, probe < ttl_ms);
    }

    // The validator is reported regardless of freshness
    #[test]
    fn prop_etag_ignores_freshness(
        key in key_strategy(),
        etag in "\"[a-f0-9]{1,16}\"",
        elapsed in 0u64..10_000_000,
    ) {
        let (cache, _, clock) = create_cache(TEST_MAX_MEMORY);

        cache.set_with_etag(&key, &json!(1), &etag, CacheOptions::with_ttl(Duration::from_secs(1)));
        clock.advance(elapsed);

        prop_assert_eq!(cache.get_etag(&key), Some(etag));
    }

    // Overfilling by one evicts exactly the oldest entry
    #[test]
    fn prop_eviction_bound(keys in prop::collection::hash_set(key_strategy(), 2..20)) {
        let keys: Vec<String> = keys.into_iter().collect();
        let capacity = keys.len() - 1;
        let (cache, _, clock) = create_cache(capacity);

        for key in &keys {
            cache.set(key, &json!(key), CacheOptions::default());
            clock.advance(1);
        }

        prop_assert_eq!(cache.memory_len(), capacity);
        prop_assert!(!cache.in_memory(&keys[0]), "Oldest key should have been evicted");
        for key in keys.iter().skip(1) {
            prop_assert!(cache.in_memory(key), "Key '{}' should still be in memory", key);
        }
    }

    // Memory never exceeds its bound, whatever the write pattern
    #[test]
    fn prop_capacity_enforcement(keys in prop::collection::vec(key_strategy(), 1..100)) {
        let (cache, _, clock) = create_cache(TEST_MAX_MEMORY);

        for key in keys {
            cache.set(&key, &json!(1), CacheOptions::default());
            clock.advance(1);
            prop_assert!(cache.memory_len() <= TEST_MAX_MEMORY);
        }
    }

    // clear_all removes exactly the prefixed durable keys
    #[test]
    fn prop_prefix_isolation(
        owned in prop::collection::hash_set(key_strategy(), 0..10),
        foreign in prop::collection::hash_set("other_app_[a-z]{1,8}", 0..10),
    ) {
        let (cache, storage, _) = create_cache(TEST_MAX_MEMORY);

        for key in &owned {
            cache.set(key, &json!(key), CacheOptions::default());
        }
        for key in &foreign {
            storage.set_item(key, "foreign").unwrap();
        }

        cache.clear_all();

        let remaining: HashSet<String> = storage.keys().into_iter().collect();
        prop_assert_eq!(remaining, foreign);
        prop_assert_eq!(cache.memory_len(), 0);
    }

    // A sweep removes exactly the entries whose expiry has passed
    #[test]
    fn prop_cleanup_sweep(
        ttls in prop::collection::vec(1u64..10_000, 1..20),
        elapsed in 0u64..10_000,
    ) {
        let (cache, storage, clock) = create_cache(64);

        for (i, ttl) in ttls.iter().enumerate() {
            let options = CacheOptions::with_ttl(Duration::from_millis(*ttl));
            cache.set(&format!("k{i}"), &json!(i), options);
        }
        clock.advance(elapsed);

        let report = cache.cleanup();
        let expired = ttls.iter().filter(|ttl| **ttl <= elapsed).count();
        prop_assert_eq!(report.memory_removed, expired);
        prop_assert_eq!(report.durable_removed, expired);

        for (i, ttl) in ttls.iter().enumerate() {
            let key = format!("k{i}");
            let alive = *ttl > elapsed;
            prop_assert_eq!(cache.in_memory(&key), alive);
            prop_assert_eq!(storage.get_item(&format!("admin_cache_{key}")).is_some(), alive);
        }
    }
}

// == Additional Unit Tests for Edge Cases ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_isolation_scenario() {
        let (cache, storage, _) = create_cache(TEST_MAX_MEMORY);

        storage.set_item("admin_cache_a", "{}").unwrap();
        storage.set_item("admin_cache_b", "{}").unwrap();
        storage.set_item("other_app_x", "{}").unwrap();

        cache.clear_all();

        assert_eq!(storage.keys(), vec!["other_app_x".to_string()]);
    }

    #[test]
    fn test_stats_track_hits_and_misses() {
        let (cache, _, _) = create_cache(TEST_MAX_MEMORY);

        cache.set("a", &1, CacheOptions::default());
        let _ = cache.get::<u32>("a");
        let _ = cache.get::<u32>("b");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }
}
