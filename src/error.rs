//! Error types for the request cache
//!
//! Provides unified error handling using thiserror. Only `fetch` surfaces
//! `CacheError` to callers; `StorageError` is recovered inside the cache.

use thiserror::Error;

// == Cache Error Enum ==
/// Errors a caller of `RequestCache::fetch` can observe.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Origin answered with a status that is neither 2xx nor a usable 304
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// The transport failed before a response was received
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body was not valid JSON for the requested type
    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl CacheError {
    /// Returns the HTTP status code carried by a protocol fault.
    pub fn status(&self) -> Option<u16> {
        match self {
            CacheError::Http { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        CacheError::Transport(err.to_string())
    }
}

// == Storage Error Enum ==
/// Failures raised by a durable store implementation.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Write would exceed the store's byte quota
    #[error("Storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },

    /// Backing file could not be read or written
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backing file holds something other than a JSON object of strings
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for fetch-level operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_carries_status() {
        let err = CacheError::Http { status: 500 };
        assert_eq!(err.status(), Some(500));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_non_http_errors_have_no_status() {
        let err = CacheError::Transport("connection reset".to_string());
        assert_eq!(err.status(), None);

        let decode = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert_eq!(CacheError::from(decode).status(), None);
    }

    #[test]
    fn test_quota_error_message() {
        let err = StorageError::QuotaExceeded {
            needed: 120,
            quota: 100,
        };
        assert_eq!(
            err.to_string(),
            "Storage quota exceeded: 120 bytes needed, 100 allowed"
        );
    }
}
