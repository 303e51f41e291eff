//! Worker pool configuration
//!
//! Validation and presets for the bounded worker pool.

use serde::{Deserialize, Serialize};

use crate::constants::workers;
use crate::errors::{PoolError, PoolResult};

/// Configuration for the bounded worker pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrently executing tasks; also the queue depth
    pub worker_count: usize,
    /// Channel buffer size for progress reporting
    pub progress_buffer_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: workers::DEFAULT_WORKER_COUNT,
            progress_buffer_size: workers::PROGRESS_BUFFER_SIZE,
        }
    }
}

impl WorkerConfig {
    /// Validate configuration values
    pub fn validate(&self) -> PoolResult<()> {
        if self.worker_count == 0 {
            return Err(PoolError::InvalidCapacity {
                capacity: self.worker_count,
            });
        }

        if self.worker_count > workers::MAX_WORKER_COUNT {
            tracing::warn!(
                "Worker count ({}) exceeds recommended maximum ({})",
                self.worker_count,
                workers::MAX_WORKER_COUNT
            );
        }

        Ok(())
    }
}

/// Builder for WorkerConfig
#[derive(Debug, Default)]
pub struct WorkerConfigBuilder {
    config: WorkerConfig,
}

impl WorkerConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: WorkerConfig::default(),
        }
    }

    /// Set the number of workers
    pub fn worker_count(mut self, count: usize) -> Self {
        self.config.worker_count = count;
        self
    }

    /// Set progress buffer size
    pub fn progress_buffer_size(mut self, size: usize) -> Self {
        self.config.progress_buffer_size = size;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> PoolResult<WorkerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration presets for different deployment scenarios
pub struct ConfigPresets;

impl ConfigPresets {
    /// Conservative concurrency for shared CDNs
    pub fn production() -> WorkerConfig {
        WorkerConfig {
            worker_count: 8,
            ..Default::default()
        }
    }

    /// Small pool with a short progress buffer
    pub fn testing() -> WorkerConfig {
        WorkerConfig {
            worker_count: 2,
            progress_buffer_size: 16,
        }
    }

    /// Wide pool for fast links and permissive origins
    pub fn high_throughput() -> WorkerConfig {
        WorkerConfig {
            worker_count: 32,
            progress_buffer_size: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WorkerConfig::default();
        assert_eq!(config.worker_count, workers::DEFAULT_WORKER_COUNT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = WorkerConfigBuilder::new().worker_count(0).build();
        assert!(matches!(result, Err(PoolError::InvalidCapacity { capacity: 0 })));
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(ConfigPresets::production().validate().is_ok());
        assert!(ConfigPresets::testing().validate().is_ok());
        assert!(ConfigPresets::high_throughput().validate().is_ok());
    }
}
