//! Request Cache - a two-tier client-side cache for REST payloads
//!
//! Keeps recently fetched JSON in memory and in a durable key-value store,
//! expires it by TTL, and revalidates stale entries with ETags.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod storage;
pub mod tasks;

pub use cache::{CacheOptions, RequestCache};
pub use config::Config;
pub use http::{FetchOptions, FetchResult, ReqwestTransport, Transport};
pub use tasks::Sweeper;
