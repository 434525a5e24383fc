//! Durable Storage Module
//!
//! The string-keyed store backing the cache's durable tier, plus the
//! implementations shipped with the crate.

mod file;
mod memory;

use std::sync::Arc;

use crate::error::StorageError;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// A synchronous, string-keyed store with a finite quota.
///
/// The store is shared process-wide; callers are expected to namespace their
/// keys. Only writes and removals can fail.
pub trait DurableStore: Send + Sync {
    /// Returns the raw value under `key`.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, failing with `QuotaExceeded` when full.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`; removing an unknown key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Removes every key in `keys`.
    ///
    /// Stores with a costly write path should override this to commit once.
    fn remove_items(&self, keys: &[String]) -> Result<(), StorageError> {
        for key in keys {
            self.remove_item(key)?;
        }
        Ok(())
    }

    /// Lists every key currently held, across all namespaces.
    fn keys(&self) -> Vec<String>;

    /// Whether this environment actually persists anything.
    fn is_available(&self) -> bool {
        true
    }
}

impl<S: DurableStore + ?Sized> DurableStore for Arc<S> {
    fn get_item(&self, key: &str) -> Option<String> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }

    fn remove_items(&self, keys: &[String]) -> Result<(), StorageError> {
        (**self).remove_items(keys)
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

impl<S: DurableStore + ?Sized> DurableStore for Box<S> {
    fn get_item(&self, key: &str) -> Option<String> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }

    fn remove_items(&self, keys: &[String]) -> Result<(), StorageError> {
        (**self).remove_items(keys)
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

/// Storage for hosts without a durable tier.
/// Reads always miss and writes are discarded, leaving the cache memory-only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStorage;

impl DurableStore for NoopStorage {
    fn get_item(&self, _key: &str) -> Option<String> {
        None // Always miss
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Ok(()) // Discard
    }

    fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Bytes a key/value pair occupies against a quota.
pub(crate) fn item_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}
