//! Boundary traits between the data layer and its collaborators.

pub mod cache;
pub mod executor;
pub mod spawn;

pub use cache::CacheProvider;
pub use executor::SqlExecutor;
pub use spawn::{TaskHandle, TaskSpawner, submit_to};
