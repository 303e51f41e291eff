//! HTTP client for manifest and segment retrieval
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: single-attempt GET with rate limiting and status mapping
//! - `download`: atomic file writes for fetched bodies
//! - `retry`: attempt budget and backoff between attempts

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::errors::{ConfigResult, FetchError, FetchResult};

pub mod config;
pub mod download;
pub mod http;
pub mod retry;

pub use config::ClientConfig;
pub use download::{file_name_from_url, write_atomic};
pub use retry::{retry_with_policy, BackoffPolicy, RetryPolicy};

use download::DownloadHandler;
use http::HttpHandler;

/// HTTP client for streaming manifests and their segments
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
#[derive(Debug)]
pub struct HlsClient {
    http_handler: HttpHandler,
}

impl HlsClient {
    /// Creates a client with default settings
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the HTTP client cannot be built
    pub fn new() -> ConfigResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a client with custom configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an invalid proxy, header or rate limit
    pub fn with_config(config: ClientConfig) -> ConfigResult<Self> {
        let client = config.build_http_client()?;
        let http_handler = HttpHandler::new(client, config.rate_limit_rps)?;

        tracing::debug!(
            proxy = config.proxy.as_deref().unwrap_or("none"),
            rate_limit_rps = config.rate_limit_rps,
            "Created HLS client"
        );

        Ok(Self { http_handler })
    }

    /// Fetches a text body (manifests) in a single attempt
    pub async fn fetch_content(&self, url: &Url) -> FetchResult<String> {
        self.http_handler.get_text(url).await
    }

    /// Downloads `url` into `destination_dir` in a single attempt
    ///
    /// Returns the path of the written file.
    pub async fn fetch_once(&self, url: &Url, destination_dir: &Path) -> FetchResult<PathBuf> {
        DownloadHandler::new(&self.http_handler)
            .fetch_once(url, destination_dir)
            .await
    }

    /// Downloads `url` into `destination_dir`, retrying per `policy`
    ///
    /// Each attempt is bounded by the policy's attempt timeout and aborted
    /// as soon as `cancel` fires. Returns the error from the last attempt
    /// when the budget runs out.
    pub async fn fetch_with_retry(
        &self,
        url: &Url,
        destination_dir: &Path,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> FetchResult<PathBuf> {
        let label = url.as_str();
        retry_with_policy(policy, label, |attempt| async move {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled {
                    url: url.to_string(),
                });
            }
            if attempt > 1 {
                tracing::debug!("Retrying {} (attempt {})", url, attempt);
            }

            tokio::select! {
                _ = cancel.cancelled() => Err(FetchError::Cancelled { url: url.to_string() }),
                result = self.attempt_with_deadline(url, destination_dir, policy.attempt_timeout) => result,
            }
        })
        .await
    }

    async fn attempt_with_deadline(
        &self,
        url: &Url,
        destination_dir: &Path,
        deadline: Option<Duration>,
    ) -> FetchResult<PathBuf> {
        match deadline {
            Some(limit) => tokio::time::timeout(limit, self.fetch_once(url, destination_dir))
                .await
                .map_err(|_| FetchError::Timeout {
                    url: url.to_string(),
                    seconds: limit.as_secs(),
                })?,
            None => self.fetch_once(url, destination_dir).await,
        }
    }
}
