//! HLS Fetcher Library
//!
//! Downloads an HTTP Live Streaming presentation for local playback. The
//! root manifest and every nested manifest are fetched recursively, the
//! leaf media segments are downloaded through a bounded worker pool with
//! per-segment retry, and the stored manifests are rewritten to reference
//! the local files.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
