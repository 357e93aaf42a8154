//! In-memory cache implementation using the moka crate.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use chathub_core::config::cache::MemoryCacheConfig;
use chathub_core::result::AppResult;
use chathub_core::traits::cache::CacheProvider;

/// In-memory cache provider using moka.
///
/// Counters (generation keys) are held in a separate map so `incr` is
/// atomic; the current value is mirrored into the moka cache for `get`
/// visibility.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    /// The underlying moka cache.
    cache: Cache<String, String>,
    /// Counters stored separately for atomic incr.
    counters: Arc<dashmap::DashMap<String, AtomicI64>>,
}

impl MemoryCacheProvider {
    /// Create a new in-memory cache from configuration.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.time_to_live_seconds))
            .build();

        Self {
            cache,
            counters: Arc::new(dashmap::DashMap::new()),
        }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.cache.get(key).await)
    }

    async fn set(&self, key: &str, value: &str, _ttl: Duration) -> AppResult<()> {
        // moka enforces TTL at cache level, set at construction time; the
        // per-entry TTL is honored by the shared-store backend instead.
        self.cache.insert(key.to_string(), value.to_string()).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.cache.remove(key).await;
        self.counters.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.cache.contains_key(key))
    }

    async fn incr(&self, key: &str) -> AppResult<i64> {
        let entry = self
            .counters
            .entry(key.to_string())
            .or_insert_with(|| AtomicI64::new(0));
        let new_val = entry.value().fetch_add(1, Ordering::SeqCst) + 1;
        // Mirror into the cache for get() visibility.
        self.cache.insert(key.to_string(), new_val.to_string()).await;
        Ok(new_val)
    }

    async fn delete_prefix(&self, prefix: &str) -> AppResult<u64> {
        let mut count = 0u64;

        // Collect keys first; moka iteration does not support concurrent removal.
        let keys_to_remove: Vec<String> = self
            .cache
            .iter()
            .filter(|entry| entry.0.starts_with(prefix))
            .map(|entry| entry.0.to_string())
            .collect();

        for key in keys_to_remove {
            self.cache.remove(&key).await;
            self.counters.remove(&key);
            count += 1;
        }

        debug!(prefix, count, "Deleted keys matching prefix");
        Ok(count)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn flush_all(&self) -> AppResult<()> {
        self.cache.invalidate_all();
        self.counters.clear();
        Ok(())
    }
}
