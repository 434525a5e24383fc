//! Conditional Fetch Module
//!
//! `fetch` layers an HTTP conditional GET over the cache: serve fresh
//! entries locally, revalidate stale ones with `If-None-Match`, and store
//! whatever the origin sends back.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{CacheOptions, Clock, RequestCache};
use crate::error::{CacheError, Result};
use crate::http::{FetchOptions, FetchResult, HttpResponse, Transport};
use crate::storage::DurableStore;

impl<S: DurableStore, C: Clock> RequestCache<S, C> {
    // == Fetch ==
    /// Fetches `url` through the cache.
    ///
    /// 1. A fresh entry under the cache key (`options.cache_key` or the URL)
    ///    is returned without touching the network.
    /// 2. Otherwise the request goes out, carrying `If-None-Match` when a
    ///    validator is known for the key.
    /// 3. On `304 Not Modified` the previously cached payload is returned
    ///    and its lifetime renewed; no body is parsed.
    /// 4. On any other non-2xx status `CacheError::Http` is returned and
    ///    nothing is stored.
    /// 5. On success the JSON body is stored (with its `ETag`, if any).
    ///
    /// A 304 with nothing left to serve triggers exactly one unconditional
    /// re-fetch. There is no per-key request coalescing: concurrent callers
    /// missing on the same key each hit the network. Transport and decode
    /// errors propagate unchanged; nothing is retried.
    pub async fn fetch<T, X>(
        &self,
        transport: &X,
        url: &str,
        options: FetchOptions,
    ) -> Result<FetchResult<T>>
    where
        T: Serialize + DeserializeOwned,
        X: Transport,
    {
        let key = options.cache_key.clone().unwrap_or_else(|| url.to_string());

        // Snapshot before `get` purges a stale entry
        let known = self.peek(&key);

        if let Some(data) = self.get::<T>(&key) {
            debug!("Serving {} from cache", key);
            // `get` may have promoted a newer durable entry over `known`
            return Ok(FetchResult {
                data,
                from_cache: true,
                etag: self.get_etag(&key),
            });
        }

        let etag = known.as_ref().and_then(|entry| entry.etag.clone());
        let response = transport
            .send(options.to_request(url, etag.as_deref()))
            .await?;

        if !response.is_not_modified() {
            return self.store_response(&key, response, options.cache_options);
        }

        // Another caller may have refreshed the key while we waited
        if let Some(data) = self.get::<T>(&key) {
            return Ok(FetchResult {
                data,
                from_cache: true,
                etag,
            });
        }

        let stale = known.as_ref().and_then(|entry| entry.data_as::<T>());
        if let (Some(data), Some(tag)) = (stale, etag.as_deref()) {
            debug!("Revalidated {} ({})", key, tag);
            self.set_with_etag(&key, &data, tag, options.cache_options);
            return Ok(FetchResult {
                data,
                from_cache: true,
                etag,
            });
        }

        warn!("{} answered 304 but nothing is cached under {}; refetching", url, key);
        let response = transport.send(options.to_request(url, None)).await?;
        self.store_response(&key, response, options.cache_options)
    }

    fn store_response<T>(
        &self,
        key: &str,
        response: HttpResponse,
        options: CacheOptions,
    ) -> Result<FetchResult<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        if !response.is_success() {
            warn!("Request for {} failed with status {}", key, response.status);
            return Err(CacheError::Http {
                status: response.status.as_u16(),
            });
        }

        let data: T = response.json()?;
        let etag = response.etag();

        match etag.as_deref() {
            Some(tag) => self.set_with_etag(key, &data, tag, options),
            None => self.set(key, &data, options),
        }

        Ok(FetchResult {
            data,
            from_cache: false,
            etag,
        })
    }
}
