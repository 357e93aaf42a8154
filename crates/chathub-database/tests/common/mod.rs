//! Shared test harness: repository wired to the in-memory executor and
//! the in-memory cache provider.

use std::sync::Arc;

use chathub_cache::memory::MemoryCacheProvider;
use chathub_cache::service::{CacheService, CacheTtls};
use chathub_core::config::cache::{CacheConfig, MemoryCacheConfig};
use chathub_core::schema::Entity;
use chathub_database::Repository;
use chathub_database::testing::MemoryExecutor;
use chathub_id::IdGenerator;

pub struct Harness {
    pub executor: Arc<MemoryExecutor>,
    pub provider: Arc<MemoryCacheProvider>,
    pub cache: CacheService,
    pub ids: Arc<IdGenerator>,
}

impl Harness {
    pub fn new() -> Self {
        let executor = Arc::new(MemoryExecutor::new());
        let provider = Arc::new(MemoryCacheProvider::new(&MemoryCacheConfig::default()));
        let shared: Arc<dyn chathub_core::traits::cache::CacheProvider> = provider.clone();
        let cache = CacheService::new(shared, CacheTtls::from(&CacheConfig::default()));
        let ids = Arc::new(IdGenerator::new(1).expect("valid service id"));
        Self {
            executor,
            provider,
            cache,
            ids,
        }
    }

    /// Raw provider read, bypassing the cache service.
    pub async fn provider_get(&self, key: &str) -> Option<String> {
        use chathub_core::traits::cache::CacheProvider;
        self.provider.get(key).await.expect("memory provider never fails")
    }

    pub fn repository<E: Entity>(&self) -> Repository<E> {
        let executor: Arc<dyn chathub_core::traits::executor::SqlExecutor> = self.executor.clone();
        Repository::new(executor, self.cache.clone(), self.ids.clone())
    }
}
