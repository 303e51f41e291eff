//! Core application logic for HLS Fetcher
//!
//! This module contains the HTTP client, manifest resolution and rewriting,
//! the bounded worker pool, the completion barrier, and the coordinator that
//! ties them into a download session.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use hls_fetcher::app::{Coordinator, CoordinatorConfig, HlsClient};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(HlsClient::new()?);
//! let coordinator = Coordinator::new(CoordinatorConfig::default(), client)?;
//!
//! let url = Url::parse("https://cdn.example.com/vod/index.m3u8?token=abc")?;
//! let result = coordinator.download(&url, Path::new("./vod")).await?;
//! for failure in result.failures() {
//!     eprintln!("{}: {:?}", failure.file_name, failure.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod barrier;
pub mod client;
pub mod coordinator;
pub mod manifest;
pub mod worker;

// Re-export main public API
pub use barrier::CompletionBarrier;
pub use client::{BackoffPolicy, ClientConfig, HlsClient, RetryPolicy};
pub use coordinator::{
    cancel_on_signal, plan_downloads, Coordinator, CoordinatorConfig, SegmentOutcome,
    SegmentProgress, SegmentStatus, SessionResult,
};
pub use manifest::{
    find_missing_segments, normalize, LineClassifier, ManifestConfig, ManifestReference,
    ManifestResolver, ManifestRewriter, SegmentRef,
};
pub use worker::{WorkerConfig, WorkerPool};
