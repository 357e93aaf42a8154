//! Distributed ID generator configuration.

use serde::{Deserialize, Serialize};

/// ID generator configuration.
///
/// Every process/service instance must be configured with a distinct
/// `service_id`; two instances sharing one can generate colliding ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdGeneratorConfig {
    /// This service instance's identifier (0..=1023).
    #[serde(default)]
    pub service_id: u16,
}

impl Default for IdGeneratorConfig {
    fn default() -> Self {
        Self { service_id: 0 }
    }
}
