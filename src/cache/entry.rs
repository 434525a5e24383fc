//! Cache Entry Module
//!
//! Defines the unit of storage shared by the memory and durable tiers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// A cached payload with its creation time, validator and expiry.
///
/// Serialized as `{"data":..,"timestamp":..,"etag":..,"expiresAt":..}`; the
/// `etag` field is omitted when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T = Value> {
    /// The stored payload
    pub data: T,
    /// Creation timestamp (Unix milliseconds), used only for eviction order
    pub timestamp: u64,
    /// HTTP validator returned alongside the payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates an entry written at `now_ms` that lives for `ttl_ms`.
    pub fn new(data: T, now_ms: u64, ttl_ms: u64, etag: Option<String>) -> Self {
        Self {
            data,
            timestamp: now_ms,
            etag,
            expires_at: now_ms.saturating_add(ttl_ms),
        }
    }

    // == Is Expired ==
    /// An entry is stale once `now_ms` reaches `expires_at`.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    /// Remaining lifetime in milliseconds, `0` once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at.saturating_sub(now_ms)
    }
}

impl CacheEntry<Value> {
    /// Parses a durable-tier string.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Renders the entry for the durable tier.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Converts the payload into the caller's type, `None` on shape mismatch.
    pub fn data_as<T: DeserializeOwned>(&self) -> Option<T> {
        T::deserialize(&self.data).ok()
    }
}
