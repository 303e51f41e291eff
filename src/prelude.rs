//! Prelude module for HLS Fetcher Library
//!
//! Re-exports the items most integrations need, so a single
//! `use hls_fetcher::prelude::*;` is enough for typical usage.
//!
//! # Usage
//!
//! ```rust,no_run
//! use hls_fetcher::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::load(None).await?;
//!     let client = Arc::new(HlsClient::with_config(config.client.clone())?);
//!     let coordinator = Coordinator::new(config.coordinator_config(), client)?;
//!     let _token = coordinator.cancellation_token();
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

pub use crate::config::AppConfig;

pub use crate::app::{
    // Transport
    BackoffPolicy,
    ClientConfig,
    // Synchronization
    CompletionBarrier,
    // Orchestration
    Coordinator,
    CoordinatorConfig,
    HlsClient,
    ManifestConfig,
    // Manifests
    ManifestResolver,
    ManifestRewriter,
    RetryPolicy,
    SegmentOutcome,
    SegmentProgress,
    SegmentRef,
    SessionResult,
    WorkerConfig,
    WorkerPool,
    find_missing_segments,
};
