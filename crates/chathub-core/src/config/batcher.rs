//! Write batcher configuration.

use serde::{Deserialize, Serialize};

/// Configuration shared by the save and delete batchers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatcherConfig {
    /// Buffer size that triggers an immediate flush.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Interval in seconds between timer-driven flushes.
    #[serde(default = "default_flush_interval")]
    pub flush_interval_seconds: u64,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            flush_interval_seconds: default_flush_interval(),
        }
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_flush_interval() -> u64 {
    5
}
