//! Command-line argument parsing for HLS Fetcher
//!
//! Defines the CLI with clap derive macros. Flags given here override the
//! configuration file and environment.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use url::Url;

use crate::config::AppConfig;

/// HLS Fetcher - download an HLS presentation for local playback
#[derive(Parser, Debug)]
#[command(
    name = "hls_fetcher",
    version,
    about = "Download HLS playlists and their segments for offline playback",
    long_about = "Fetches a root .m3u8 manifest and every nested manifest it references,
downloads all media segments concurrently with retry, and rewrites the stored
manifests so the directory plays back without network access."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a manifest tree and all of its segments
    Download(DownloadArgs),

    /// List segments referenced by a local manifest that are missing on disk
    Verify(VerifyArgs),
}

/// Arguments for the download command
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Root manifest URL
    #[arg(value_name = "URL")]
    pub url: Url,

    /// Destination directory, created if absent
    #[arg(value_name = "DIR")]
    pub output: PathBuf,

    /// Number of concurrent segment downloads
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Attempts per segment, including the first
    #[arg(short = 'a', long)]
    pub max_attempts: Option<u32>,

    /// Proxy URL (http, https or socks5)
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Referer header sent with every request
    #[arg(long, value_name = "URL")]
    pub referer: Option<String>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Write the session report as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

/// Arguments for the verify command
#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Local manifest to check
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Directory holding the downloaded files; defaults to the manifest's
    #[arg(value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        self.requested_log_level().unwrap_or(tracing::Level::WARN)
    }

    /// Level chosen by a verbosity flag, if any was given
    pub fn requested_log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}

impl DownloadArgs {
    /// Check flag values that clap cannot
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == Some(0) {
            return Err("Number of workers must be greater than 0".to_string());
        }

        if self.max_attempts == Some(0) {
            return Err("Max attempts must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Overlays the flags that were given onto `config`
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(workers) = self.workers {
            config.pool.worker_count = workers;
        }
        if let Some(attempts) = self.max_attempts {
            config.retry.max_attempts = attempts;
        }
        if let Some(proxy) = &self.proxy {
            config.client.proxy = Some(proxy.clone());
        }
        if let Some(referer) = &self.referer {
            config.client.referer = Some(referer.clone());
        }
    }
}

impl VerifyArgs {
    /// Directory to look for segment files in
    pub fn resolved_directory(&self) -> PathBuf {
        match &self.directory {
            Some(dir) => dir.clone(),
            None => self
                .manifest
                .parent()
                .map(|parent| parent.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}
