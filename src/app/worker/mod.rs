//! Bounded concurrent execution
//!
//! [`WorkerPool`] runs submitted futures on a fixed number of workers with
//! backpressure: at most `capacity` tasks are queued or executing, and
//! [`WorkerPool::submit`] waits for a free slot beyond that.
//!
//! # Module Organization
//!
//! - [`config`] - Pool sizing with validation and presets
//! - [`pool`] - The pool itself
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use hls_fetcher::app::worker::{ConfigPresets, WorkerPool};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = WorkerPool::from_config(&ConfigPresets::production())?;
//!
//! for index in 0..20 {
//!     pool.submit(async move {
//!         println!("segment {index}");
//!     })
//!     .await?;
//! }
//!
//! pool.close().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod pool;

pub use config::{ConfigPresets, WorkerConfig, WorkerConfigBuilder};
pub use pool::{Task, WorkerPool};
