//! Download orchestration
//!
//! A [`Coordinator`] runs one session end to end:
//!
//! 1. Resolve the manifest tree into ordered segments. Any manifest failure
//!    aborts the session before a single segment is requested.
//! 2. Drop duplicate segments and reject distinct segments that would share
//!    a local file name.
//! 3. Submit one fetch per distinct segment to a bounded [`WorkerPool`].
//!    Each task records its outcome and counts down a
//!    [`CompletionBarrier`] sized to the number of segments.
//! 4. Wait for the barrier, close the pool, and report a [`SessionResult`].
//!
//! Segment failures are recorded and never halt the batch.
//!
//! # Architecture
//!
//! - [`config`] - Session configuration
//! - [`stats`] - Outcome and progress types
//! - [`signals`] - Ctrl-C/SIGTERM to cancellation
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
//! let config = CoordinatorConfig::default().with_worker_count(4);
//! let coordinator = Coordinator::new(config, client)?;
//!
//! let url = Url::parse("https://cdn.example.com/live/master.m3u8")?;
//! let result = coordinator.download(&url, Path::new("./out")).await?;
//! println!("{} of {} segments", result.succeeded, result.outcomes.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod signals;
pub mod stats;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::barrier::CompletionBarrier;
use crate::app::client::{HlsClient, RetryPolicy};
use crate::app::manifest::{ManifestResolver, SegmentRef};
use crate::app::worker::WorkerPool;
use crate::errors::{ManifestError, ManifestResult, Result};

pub use config::CoordinatorConfig;
pub use signals::cancel_on_signal;
pub use stats::{SegmentOutcome, SegmentProgress, SegmentStatus, SessionResult};

/// Orchestrates manifest resolution and bounded segment downloads
///
/// One coordinator may run several sessions in turn, but they share one
/// cancellation token: once cancelled, every later session on the same
/// coordinator skips its segments. Create a new coordinator to start over.
#[derive(Debug)]
pub struct Coordinator {
    config: CoordinatorConfig,
    client: Arc<HlsClient>,
    resolver: ManifestResolver,
    cancel: CancellationToken,
    progress_tx: Option<mpsc::Sender<SegmentProgress>>,
}

impl Coordinator {
    /// Creates a coordinator sharing `client` for manifests and segments
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration section is invalid
    pub fn new(config: CoordinatorConfig, client: Arc<HlsClient>) -> Result<Self> {
        config.validate()?;
        let resolver = ManifestResolver::new(Arc::clone(&client), config.manifest.clone())?;

        Ok(Self {
            config,
            client,
            resolver,
            cancel: CancellationToken::new(),
            progress_tx: None,
        })
    }

    /// Sends a [`SegmentProgress`] event per finished segment to `progress_tx`
    pub fn with_progress(mut self, progress_tx: mpsc::Sender<SegmentProgress>) -> Self {
        self.progress_tx = Some(progress_tx);
        self
    }

    /// Token that cancels the running session and every later one
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Downloads the manifest tree at `manifest_url` into `destination_dir`
    ///
    /// # Errors
    ///
    /// Returns an error only for session-level failures: directory creation,
    /// manifest resolution, file name collisions, or pool setup. Individual
    /// segment failures are reported in the [`SessionResult`].
    pub async fn download(&self, manifest_url: &Url, destination_dir: &Path) -> Result<SessionResult> {
        let started_at = Utc::now();
        let session_start = Instant::now();
        info!(
            "Starting download of {} into {}",
            manifest_url,
            destination_dir.display()
        );

        tokio::fs::create_dir_all(destination_dir).await?;

        let segments = self.resolver.resolve(manifest_url, destination_dir).await?;
        let distinct = plan_downloads(&segments)?;
        if distinct.len() < segments.len() {
            debug!(
                "{} duplicate segment references fetched once",
                segments.len() - distinct.len()
            );
        }

        let statuses = self.fetch_all(&distinct, destination_dir).await?;

        let outcomes: Vec<SegmentOutcome> = distinct
            .into_iter()
            .zip(statuses)
            .map(|(segment, status)| SegmentOutcome {
                file_name: segment.file_name,
                url: segment.url,
                status,
            })
            .collect();
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let failed = outcomes.len() - succeeded;
        let elapsed = session_start.elapsed();

        if failed == 0 {
            info!(
                "Downloaded {} segments in {:.1}s",
                succeeded,
                elapsed.as_secs_f64()
            );
        } else {
            warn!(
                "{} of {} segments failed after {:.1}s",
                failed,
                outcomes.len(),
                elapsed.as_secs_f64()
            );
        }

        Ok(SessionResult {
            manifest_url: manifest_url.clone(),
            segments,
            outcomes,
            succeeded,
            failed,
            cancelled: self.cancel.is_cancelled(),
            started_at,
            finished_at: Utc::now(),
            elapsed,
        })
    }

    async fn fetch_all(
        &self,
        segments: &[SegmentRef],
        destination_dir: &Path,
    ) -> Result<Vec<SegmentStatus>> {
        let total = segments.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let pool = WorkerPool::from_config(&self.config.worker)?;
        let barrier = Arc::new(CompletionBarrier::new(total));
        let table: Arc<Mutex<Vec<Option<SegmentStatus>>>> = Arc::new(Mutex::new(vec![None; total]));
        let completed = Arc::new(AtomicUsize::new(0));
        let destination: Arc<PathBuf> = Arc::new(destination_dir.to_path_buf());
        let policy: Arc<RetryPolicy> = Arc::new(self.config.retry.clone());

        for (index, segment) in segments.iter().enumerate() {
            let task = SegmentTask {
                index,
                total,
                url: segment.url.clone(),
                file_name: segment.file_name.clone(),
                client: Arc::clone(&self.client),
                destination: Arc::clone(&destination),
                policy: Arc::clone(&policy),
                cancel: self.cancel.clone(),
                table: Arc::clone(&table),
                completed: Arc::clone(&completed),
                barrier: Arc::clone(&barrier),
                progress_tx: self.progress_tx.clone(),
            };
            pool.submit(task.run()).await?;
        }

        barrier.wait().await;
        pool.close().await;

        let statuses = table
            .lock()
            .await
            .drain(..)
            .map(|status| {
                status.unwrap_or_else(|| SegmentStatus::Failed {
                    error: "segment was never executed".to_string(),
                })
            })
            .collect();
        Ok(statuses)
    }
}

/// Everything one pooled fetch needs, owned so the future is `'static`
struct SegmentTask {
    index: usize,
    total: usize,
    url: Url,
    file_name: String,
    client: Arc<HlsClient>,
    destination: Arc<PathBuf>,
    policy: Arc<RetryPolicy>,
    cancel: CancellationToken,
    table: Arc<Mutex<Vec<Option<SegmentStatus>>>>,
    completed: Arc<AtomicUsize>,
    barrier: Arc<CompletionBarrier>,
    progress_tx: Option<mpsc::Sender<SegmentProgress>>,
}

/// Counts a barrier down when dropped, including during a panic unwind
struct CountDownOnDrop(Arc<CompletionBarrier>);

impl Drop for CountDownOnDrop {
    fn drop(&mut self) {
        self.0.count_down();
    }
}

impl SegmentTask {
    async fn run(self) {
        let _release = CountDownOnDrop(Arc::clone(&self.barrier));

        let status = match self
            .client
            .fetch_with_retry(&self.url, &self.destination, &self.policy, &self.cancel)
            .await
        {
            Ok(path) => {
                debug!("Fetched {}", self.file_name);
                SegmentStatus::Succeeded { path }
            }
            Err(e) => {
                warn!("Giving up on {}: {}", self.file_name, e);
                SegmentStatus::Failed {
                    error: e.to_string(),
                }
            }
        };
        let succeeded = matches!(status, SegmentStatus::Succeeded { .. });

        self.table.lock().await[self.index] = Some(status);
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(tx) = &self.progress_tx {
            let event = SegmentProgress {
                file_name: self.file_name.clone(),
                succeeded,
                completed,
                total: self.total,
            };
            // Receiver may have gone away; the session continues regardless
            let _ = tx.send(event).await;
        }
    }
}

/// Reduces resolved segments to the distinct set to fetch, in resolved order
///
/// References to the same URL (query ignored) are fetched once. Distinct URLs
/// sharing a local file name would overwrite each other and are rejected.
pub fn plan_downloads(segments: &[SegmentRef]) -> ManifestResult<Vec<SegmentRef>> {
    let mut by_name: HashMap<&str, &SegmentRef> = HashMap::new();
    let mut distinct = Vec::new();

    for segment in segments {
        match by_name.get(segment.file_name.as_str()) {
            Some(first) if first.identity() == segment.identity() => continue,
            Some(first) => {
                return Err(ManifestError::NameCollision {
                    file_name: segment.file_name.clone(),
                    first: first.url.to_string(),
                    second: segment.url.to_string(),
                });
            }
            None => {
                by_name.insert(segment.file_name.as_str(), segment);
                distinct.push(segment.clone());
            }
        }
    }

    Ok(distinct)
}
