//! File-backed durable store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

use super::{item_size, DurableStore};
use crate::error::StorageError;

/// A store persisted as one JSON object on disk.
///
/// The whole file is loaded at open and rewritten after every mutation, so
/// entries survive process restarts. Each `set_item` or `remove_item` costs a
/// full rewrite; `remove_items` batches removals into one.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
    quota_bytes: usize,
}

impl FileStorage {
    /// Opens (or creates) the store at `path`.
    ///
    /// A missing file starts empty. A file that is not a JSON object of
    /// strings is logged and replaced on the next write.
    pub fn open(path: impl AsRef<Path>, quota_bytes: usize) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let items = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(items) => items,
                Err(e) => {
                    warn!("Discarding unreadable storage file {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            items: Mutex::new(items),
            quota_bytes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes through a sibling temp file so a crash never leaves half a file.
    fn persist(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let contents = serde_json::to_string(items)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl DurableStore for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.lock();

        let used: usize = items.iter().map(|(k, v)| item_size(k, v)).sum();
        let replaced = items.get(key).map_or(0, |old| item_size(key, old));
        let needed = used - replaced + item_size(key, value);
        if needed > self.quota_bytes {
            return Err(StorageError::QuotaExceeded {
                needed,
                quota: self.quota_bytes,
            });
        }

        let previous = items.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&items) {
            // Roll back so memory matches what is on disk
            match previous {
                Some(old) => items.insert(key.to_string(), old),
                None => items.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.lock();
        if let Some(old) = items.remove(key) {
            if let Err(e) = self.persist(&items) {
                items.insert(key.to_string(), old);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Removes all of `keys` with a single rewrite of the file.
    fn remove_items(&self, keys: &[String]) -> Result<(), StorageError> {
        let mut items = self.lock();
        let removed: Vec<(String, String)> = keys
            .iter()
            .filter_map(|key| items.remove_entry(key.as_str()))
            .collect();
        if removed.is_empty() {
            return Ok(());
        }

        if let Err(e) = self.persist(&items) {
            items.extend(removed);
            return Err(e);
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
}
