//! Shared test harness: repository over the in-memory executor, plus a
//! worker pool.

use std::sync::Arc;

use chathub_cache::memory::MemoryCacheProvider;
use chathub_cache::service::{CacheService, CacheTtls};
use chathub_core::config::cache::{CacheConfig, MemoryCacheConfig};
use chathub_core::schema::Entity;
use chathub_database::Repository;
use chathub_database::testing::MemoryExecutor;
use chathub_id::IdGenerator;
use chathub_worker::WorkerPool;

pub struct Harness {
    pub executor: Arc<MemoryExecutor>,
    pub cache: CacheService,
    pub ids: Arc<IdGenerator>,
    pub pool: Arc<WorkerPool>,
}

impl Harness {
    pub fn new() -> Self {
        let executor = Arc::new(MemoryExecutor::new());
        let provider: Arc<dyn chathub_core::traits::cache::CacheProvider> =
            Arc::new(MemoryCacheProvider::new(&MemoryCacheConfig::default()));
        let cache = CacheService::new(provider, CacheTtls::from(&CacheConfig::default()));
        let ids = Arc::new(IdGenerator::new(1).expect("valid service id"));
        let pool = Arc::new(WorkerPool::new(2));
        Self {
            executor,
            cache,
            ids,
            pool,
        }
    }

    pub fn repository<E: Entity>(&self) -> Repository<E> {
        let executor: Arc<dyn chathub_core::traits::executor::SqlExecutor> = self.executor.clone();
        Repository::new(executor, self.cache.clone(), self.ids.clone())
    }
}
