//! Cache Module
//!
//! Two-tier request caching with TTL expiry, ETag revalidation and
//! FIFO-by-creation eviction.

mod clock;
mod entry;
mod fetch;
mod memory;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use memory::MemoryTier;
pub use stats::CacheStats;
pub use store::{CacheOptions, CacheSettings, CleanupReport, RequestCache};
