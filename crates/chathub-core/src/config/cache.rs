//! Cache provider configuration.

use serde::{Deserialize, Serialize};

/// Top-level cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache provider type: `"memory"` or `"redis"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Nominal TTL for cached entities in seconds.
    #[serde(default = "default_entity_ttl")]
    pub entity_ttl_seconds: u64,
    /// Nominal TTL for cached existence booleans in seconds.
    #[serde(default = "default_exists_ttl")]
    pub exists_ttl_seconds: u64,
    /// Nominal TTL for cached query results in seconds.
    #[serde(default = "default_query_ttl")]
    pub query_ttl_seconds: u64,
    /// Random jitter applied around every nominal TTL, in seconds.
    #[serde(default = "default_ttl_jitter")]
    pub ttl_jitter_seconds: u64,
    /// Minimum TTL after jitter, in seconds.
    #[serde(default = "default_min_ttl")]
    pub min_ttl_seconds: u64,
    /// Redis-specific cache configuration.
    #[serde(default)]
    pub redis: RedisCacheConfig,
    /// In-memory cache configuration.
    #[serde(default)]
    pub memory: MemoryCacheConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            entity_ttl_seconds: default_entity_ttl(),
            exists_ttl_seconds: default_exists_ttl(),
            query_ttl_seconds: default_query_ttl(),
            ttl_jitter_seconds: default_ttl_jitter(),
            min_ttl_seconds: default_min_ttl(),
            redis: RedisCacheConfig::default(),
            memory: MemoryCacheConfig::default(),
        }
    }
}

/// Redis cache backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisCacheConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Key prefix. Empty by default: the data-layer key namespaces
    /// (`entity_cache:`, `table_generation:`, `query_cache:`) are shared
    /// across services and must match existing deployments exactly.
    #[serde(default)]
    pub key_prefix: String,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: String::new(),
        }
    }
}

/// In-memory cache backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCacheConfig {
    /// Maximum number of entries in the cache.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// TTL for in-memory entries in seconds.
    #[serde(default = "default_memory_ttl")]
    pub time_to_live_seconds: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            time_to_live_seconds: default_memory_ttl(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_entity_ttl() -> u64 {
    3600
}

fn default_exists_ttl() -> u64 {
    300
}

fn default_query_ttl() -> u64 {
    86_400
}

fn default_ttl_jitter() -> u64 {
    1800
}

fn default_min_ttl() -> u64 {
    60
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_max_capacity() -> u64 {
    100_000
}

fn default_memory_ttl() -> u64 {
    86_400
}
