//! Background Tasks Module
//!
//! Contains background tasks that run periodically for the lifetime of a cache.
//!
//! # Tasks
//! - Sweeper: removes expired entries from both tiers at a fixed interval

mod cleanup;

pub use cleanup::Sweeper;
