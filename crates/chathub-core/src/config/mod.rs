//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod batcher;
pub mod cache;
pub mod database;
pub mod id;
pub mod logging;
pub mod worker;

use serde::{Deserialize, Serialize};

use self::batcher::BatcherConfig;
use self::cache::CacheConfig;
use self::database::DatabaseConfig;
use self::id::IdGeneratorConfig;
use self::logging::LoggingConfig;
use self::worker::WorkerPoolConfig;

use crate::error::AppError;

/// Root configuration for a service using the ChatHub data layer.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Cache provider and TTL settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Distributed ID generator settings.
    #[serde(default)]
    pub id_generator: IdGeneratorConfig,
    /// Worker pool settings.
    #[serde(default)]
    pub worker: WorkerPoolConfig,
    /// Write batcher settings.
    #[serde(default)]
    pub batcher: BatcherConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `CHATHUB`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CHATHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
