//! The cache service: policy layer over a raw cache provider.
//!
//! Every operation here is best-effort. A provider failure is logged and
//! degraded to a cache miss (`None` / `false` / no-op), so callers can
//! always fall back to the database; the cache is never the system of
//! record. Writes apply TTL jitter to avoid synchronized mass expiry.

use std::sync::Arc;
use std::time::Duration;

use rand::RngExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use chathub_core::config::cache::CacheConfig;
use chathub_core::traits::cache::CacheProvider;

use crate::keys;

/// TTL policy derived from [`CacheConfig`].
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    /// Nominal TTL for cached entities.
    pub entity: Duration,
    /// Nominal TTL for cached existence booleans.
    pub exists: Duration,
    /// Nominal TTL for cached query results.
    pub query: Duration,
    /// Jitter spread applied around every nominal TTL.
    pub jitter: Duration,
    /// Lower bound after jitter.
    pub floor: Duration,
}

impl From<&CacheConfig> for CacheTtls {
    fn from(config: &CacheConfig) -> Self {
        Self {
            entity: Duration::from_secs(config.entity_ttl_seconds),
            exists: Duration::from_secs(config.exists_ttl_seconds),
            query: Duration::from_secs(config.query_ttl_seconds),
            jitter: Duration::from_secs(config.ttl_jitter_seconds),
            floor: Duration::from_secs(config.min_ttl_seconds),
        }
    }
}

/// Best-effort cache facade used by the repository and query builder.
#[derive(Debug, Clone)]
pub struct CacheService {
    provider: Arc<dyn CacheProvider>,
    ttls: CacheTtls,
}

impl CacheService {
    /// Create a cache service over a provider with the given TTL policy.
    pub fn new(provider: Arc<dyn CacheProvider>, ttls: CacheTtls) -> Self {
        Self { provider, ttls }
    }

    /// Nominal entity TTL.
    pub fn entity_ttl(&self) -> Duration {
        self.ttls.entity
    }

    /// Nominal existence-boolean TTL.
    pub fn exists_ttl(&self) -> Duration {
        self.ttls.exists
    }

    /// Nominal query-result TTL.
    pub fn query_ttl(&self) -> Duration {
        self.ttls.query
    }

    /// Get a raw value. Backend errors degrade to `None`.
    pub async fn get(&self, key: &str) -> Option<String> {
        match self.provider.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "cache get failed; treating as miss");
                None
            }
        }
    }

    /// Set a raw value with a jittered TTL. Backend errors degrade to a no-op.
    pub async fn set(&self, key: &str, value: &str, nominal_ttl: Duration) {
        let ttl = jittered_ttl(nominal_ttl, self.ttls.jitter, self.ttls.floor);
        if let Err(e) = self.provider.set(key, value, ttl).await {
            warn!(key, error = %e, "cache set failed; entry skipped");
        }
    }

    /// Remove a key. Backend errors degrade to a no-op.
    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.provider.delete(key).await {
            warn!(key, error = %e, "cache delete failed");
        }
    }

    /// Check key existence. Backend errors degrade to `false`.
    pub async fn exists(&self, key: &str) -> bool {
        match self.provider.exists(key).await {
            Ok(found) => found,
            Err(e) => {
                warn!(key, error = %e, "cache exists failed; treating as miss");
                false
            }
        }
    }

    /// Remove every key under a prefix. Backend errors degrade to 0.
    pub async fn clear_prefix(&self, prefix: &str) -> u64 {
        match self.provider.delete_prefix(prefix).await {
            Ok(count) => count,
            Err(e) => {
                warn!(prefix, error = %e, "cache prefix delete failed");
                0
            }
        }
    }

    /// Get a JSON-encoded value. Corrupt entries are logged and treated as
    /// misses so a bad cache entry can never poison a read path.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "corrupt cache entry; treating as miss");
                None
            }
        }
    }

    /// Set a JSON-encoded value with a jittered TTL.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, nominal_ttl: Duration) {
        match serde_json::to_string(value) {
            Ok(json) => self.set(key, &json, nominal_ttl).await,
            Err(e) => warn!(key, error = %e, "cache serialization failed; entry skipped"),
        }
    }

    /// Current generation counter of a table. Absent or unparsable
    /// counters read as 0.
    pub async fn generation_of(&self, table: &str) -> u64 {
        match self.get(&keys::generation_key(table)).await {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(table, raw = %raw, "unparsable generation counter; treating as 0");
                0
            }),
            None => 0,
        }
    }

    /// Increment a table's generation counter. Called after a database
    /// mutation commits; errors are logged and never fail the write path.
    pub async fn bump_generation(&self, table: &str) {
        if let Err(e) = self.provider.incr(&keys::generation_key(table)).await {
            warn!(table, error = %e, "generation bump failed");
        }
    }
}

/// Perturb a nominal TTL by a uniform random offset in `[-jitter, +jitter]`,
/// floored at `floor`. The spread is capped at half the nominal TTL so
/// short-lived entries keep their order of magnitude.
pub fn jittered_ttl(nominal: Duration, jitter: Duration, floor: Duration) -> Duration {
    let spread = jitter.min(nominal / 2).as_secs() as i64;
    let offset = if spread == 0 {
        0
    } else {
        rand::rng().random_range(-spread..=spread)
    };
    apply_jitter(nominal, offset, floor)
}

/// Deterministic core of [`jittered_ttl`].
fn apply_jitter(nominal: Duration, offset_secs: i64, floor: Duration) -> Duration {
    let base = nominal.as_secs() as i64 + offset_secs;
    Duration::from_secs(base.max(floor.as_secs() as i64).max(0) as u64)
}
