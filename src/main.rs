//! Request Cache - fetch JSON endpoints through the two-tier cache
//!
//! Usage: `request-cache <url>...`
//!
//! Each URL is fetched through the cache and reported as one JSON line.
//! With `CACHE_STORAGE_PATH` set, entries persist between runs and repeat
//! invocations are served from cache or revalidated with ETags.

use std::sync::Arc;

use anyhow::{bail, Context};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use request_cache::storage::{DurableStore, FileStorage, MemoryStorage};
use request_cache::{Config, FetchOptions, FetchResult, ReqwestTransport, RequestCache, Sweeper};

/// Main entry point for the request cache CLI.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the durable store and build the cache
/// 4. Start the background sweeper
/// 5. Fetch every URL given on the command line
/// 6. Stop the sweeper
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var.
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "request_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        bail!("usage: request-cache <url>...");
    }

    // Load configuration from environment variables
    let config = Config::from_env();
    info!(
        max_memory_size = config.max_memory_size,
        default_ttl_ms = config.default_ttl_ms,
        key_prefix = %config.key_prefix,
        cleanup_interval_secs = config.cleanup_interval,
        "Configuration loaded"
    );

    let storage = open_storage(&config)?;
    let cache = Arc::new(RequestCache::from_config(storage, &config));

    let sweeper = Sweeper::start(cache.clone(), config.cleanup_interval());

    let transport = ReqwestTransport::new();
    for url in &urls {
        let result: FetchResult<Value> = cache
            .fetch(&transport, url, FetchOptions::default())
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        println!(
            "{}",
            json!({
                "url": url,
                "from_cache": result.from_cache,
                "etag": result.etag,
                "data": result.data,
            })
        );
    }

    let stats = cache.stats();
    info!(
        "Done: {} memory hits, {} durable hits, {} misses",
        stats.hits, stats.durable_hits, stats.misses
    );

    if let Some(sweeper) = sweeper {
        sweeper.stop();
    }

    Ok(())
}

/// Opens the file-backed store when configured, otherwise an in-process one.
fn open_storage(config: &Config) -> anyhow::Result<Box<dyn DurableStore>> {
    match &config.storage_path {
        Some(path) => {
            let storage = FileStorage::open(path, config.storage_quota_bytes)
                .with_context(|| format!("Failed to open cache storage at {}", path.display()))?;
            info!("Using durable storage at {}", path.display());
            Ok(Box::new(storage))
        }
        None => {
            info!("No CACHE_STORAGE_PATH set, entries will not outlive this process");
            Ok(Box::new(MemoryStorage::with_quota(config.storage_quota_bytes)))
        }
    }
}
