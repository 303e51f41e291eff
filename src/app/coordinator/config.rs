//! Configuration for a download session
//!
//! Bundles pool sizing, the per-segment retry policy and manifest parsing
//! settings so a [`super::Coordinator`] can be built from one value.

use serde::{Deserialize, Serialize};

use crate::app::client::RetryPolicy;
use crate::app::manifest::ManifestConfig;
use crate::app::worker::WorkerConfig;
use crate::errors::Result;

/// Configuration for the download coordinator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Worker pool sizing
    pub worker: WorkerConfig,
    /// Retry policy applied to every segment
    pub retry: RetryPolicy,
    /// Manifest parsing settings
    pub manifest: ManifestConfig,
}

impl CoordinatorConfig {
    /// Set the number of concurrent segment fetches
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker.worker_count = count;
        self
    }

    /// Set the attempt budget per segment
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.retry.max_attempts = attempts;
        self
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Replace the manifest settings
    pub fn with_manifest_config(mut self, manifest: ManifestConfig) -> Self {
        self.manifest = manifest;
        self
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.worker.validate()?;
        self.retry.validate()?;
        self.manifest.validate()?;
        Ok(())
    }
}
