//! HTTP Module
//!
//! The request/response shapes `fetch` works with and the transport seam it
//! sends them through.

mod reqwest_transport;

#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;

use reqwest::header::{HeaderMap, HeaderValue, ETAG, IF_NONE_MATCH};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::cache::CacheOptions;
use crate::error::Result;

pub use reqwest_transport::ReqwestTransport;

/// Sends requests on behalf of the cache.
///
/// Cancellation is the transport's business: dropping the returned future
/// abandons the request and `fetch` writes nothing.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}

// == Request ==
/// An outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// The validator sent with this request, if any.
    pub fn if_none_match(&self) -> Option<&str> {
        self.headers.get(IF_NONE_MATCH).and_then(|v| v.to_str().ok())
    }
}

// == Response ==
/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Builds a response with no headers.
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Adds an `ETag` header, skipping values that are not valid header text.
    pub fn with_etag(mut self, etag: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(etag) {
            self.headers.insert(ETAG, value);
        }
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_not_modified(&self) -> bool {
        self.status == StatusCode::NOT_MODIFIED
    }

    /// The `ETag` response header.
    pub fn etag(&self) -> Option<String> {
        self.headers
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    }

    /// Parses the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

// == Fetch Options ==
/// Per-call options for `RequestCache::fetch`.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    /// Cache under this key instead of the URL
    pub cache_key: Option<String>,
    /// TTL and flags applied when the response is stored
    pub cache_options: CacheOptions,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
            cache_key: None,
            cache_options: CacheOptions::default(),
        }
    }
}

impl FetchOptions {
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn with_cache_options(mut self, options: CacheOptions) -> Self {
        self.cache_options = options;
        self
    }

    /// Builds the request for `url`, adding `If-None-Match` when a validator
    /// is known. The caller's own headers are kept.
    pub(crate) fn to_request(&self, url: &str, etag: Option<&str>) -> HttpRequest {
        let mut headers = self.headers.clone();
        if let Some(value) = etag.and_then(|tag| HeaderValue::from_str(tag).ok()) {
            headers.insert(IF_NONE_MATCH, value);
        }

        HttpRequest {
            method: self.method.clone(),
            url: url.to_string(),
            headers,
            body: self.body.clone(),
        }
    }
}

// == Fetch Result ==
/// Outcome of `RequestCache::fetch`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult<T> {
    pub data: T,
    /// True when no fresh body was downloaded
    pub from_cache: bool,
    pub etag: Option<String>,
}
