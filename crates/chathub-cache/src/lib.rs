//! # chathub-cache
//!
//! Cache providers and the cache service for the ChatHub data layer.
//! Two backends are supported:
//!
//! - **memory**: In-process cache using [moka](https://crates.io/crates/moka)
//! - **redis**: Redis-backed cache using the [redis](https://crates.io/crates/redis) crate
//!
//! The provider is selected at runtime based on configuration. On top of
//! the raw providers, [`CacheService`] applies the data layer's policies:
//! every backend failure degrades to a cache miss, TTLs are jittered, and
//! per-table generation counters drive query-cache invalidation.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;
pub mod service;

pub use provider::CacheManager;
pub use service::CacheService;
