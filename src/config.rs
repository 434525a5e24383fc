//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default number of entries held in the memory tier
pub const DEFAULT_MAX_MEMORY_SIZE: usize = 50;

/// Default entry lifetime (5 minutes)
pub const DEFAULT_TTL_MS: u64 = 300_000;

/// Prefix namespacing every durable-tier key owned by the cache
pub const DEFAULT_KEY_PREFIX: &str = "admin_cache_";

/// Default sweep interval (10 minutes)
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 600;

/// Default durable quota, matching the usual browser storage allowance
pub const DEFAULT_STORAGE_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the memory tier can hold
    pub max_memory_size: usize,
    /// Default TTL in milliseconds for entries without explicit TTL
    pub default_ttl_ms: u64,
    /// Prefix applied to durable-tier keys
    pub key_prefix: String,
    /// Background sweep interval in seconds
    pub cleanup_interval: u64,
    /// File backing the durable tier; in-process storage when unset
    pub storage_path: Option<PathBuf>,
    /// Byte quota of the durable tier
    pub storage_quota_bytes: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_MEMORY_SIZE` - Memory tier capacity (default: 50)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CACHE_KEY_PREFIX` - Durable key prefix (default: "admin_cache_")
    /// - `CACHE_CLEANUP_INTERVAL_SECS` - Sweep frequency in seconds (default: 600)
    /// - `CACHE_STORAGE_PATH` - JSON file for the durable tier (default: unset)
    /// - `CACHE_STORAGE_QUOTA_BYTES` - Durable quota in bytes (default: 5 MiB)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_memory_size: parse_var("CACHE_MAX_MEMORY_SIZE").unwrap_or(defaults.max_memory_size),
            default_ttl_ms: parse_var("CACHE_DEFAULT_TTL_MS").unwrap_or(defaults.default_ttl_ms),
            key_prefix: env::var("CACHE_KEY_PREFIX")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.key_prefix),
            cleanup_interval: parse_var("CACHE_CLEANUP_INTERVAL_SECS")
                .unwrap_or(defaults.cleanup_interval),
            storage_path: env::var("CACHE_STORAGE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            storage_quota_bytes: parse_var("CACHE_STORAGE_QUOTA_BYTES")
                .unwrap_or(defaults.storage_quota_bytes),
        }
    }

    /// Sweep interval as a `Duration`.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_memory_size: DEFAULT_MAX_MEMORY_SIZE,
            default_ttl_ms: DEFAULT_TTL_MS,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL_SECS,
            storage_path: None,
            storage_quota_bytes: DEFAULT_STORAGE_QUOTA_BYTES,
        }
    }
}
