//! Command handlers for the CLI
//!
//! Each handler loads configuration, applies flag overrides, and delegates
//! to the library. User-facing output goes to stdout/stderr; diagnostics go
//! through tracing.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::app::{cancel_on_signal, find_missing_segments, Coordinator, HlsClient, LineClassifier};
use crate::cli::args::{DownloadArgs, GlobalArgs, VerifyArgs};
use crate::cli::progress::ProgressDisplay;
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Downloads a manifest tree and its segments
///
/// # Errors
///
/// Returns an error on invalid flags or configuration, on a fatal manifest
/// failure, on cancellation, or when any segment could not be fetched.
pub async fn handle_download(args: DownloadArgs, global: &GlobalArgs) -> Result<()> {
    args.validate().map_err(AppError::generic)?;

    let mut config = AppConfig::load(global.config.as_deref()).await?;
    args.apply_to(&mut config);
    config.validate()?;
    info!(
        "Downloading {} with {} workers, {} attempts per segment",
        args.url, config.pool.worker_count, config.retry.max_attempts
    );

    let client = Arc::new(HlsClient::with_config(config.client.clone())?);
    let (progress_tx, progress_rx) = mpsc::channel(config.pool.progress_buffer_size.max(1));
    let coordinator =
        Coordinator::new(config.coordinator_config(), client)?.with_progress(progress_tx);

    let signal_listener = cancel_on_signal(coordinator.cancellation_token());
    let display = ProgressDisplay::new(!args.no_progress && !global.quiet)?;
    let renderer = display.spawn(progress_rx);

    let outcome = coordinator.download(&args.url, &args.output).await;

    // Dropping the coordinator closes the progress channel
    drop(coordinator);
    if let Err(e) = renderer.await {
        warn!("Progress display task failed: {}", e);
    }
    signal_listener.abort();

    let result = outcome?;

    if !global.quiet {
        println!("\n📊 Download Summary:");
        println!("  Segments: {}", result.outcomes.len());
        println!("  Completed: {}", result.succeeded);
        println!("  Failed: {}", result.failed);
        println!("  Total time: {:.1}s", result.elapsed.as_secs_f64());
        println!("  Output: {}", args.output.display());
    }

    if let Some(report_path) = &args.report {
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| AppError::generic(format!("Failed to serialize report: {}", e)))?;
        tokio::fs::write(report_path, json).await?;
        info!("Wrote session report to {}", report_path.display());
    }

    for failure in result.failures() {
        eprintln!("  • {} ({})", failure.file_name, failure.url);
    }

    if result.cancelled {
        return Err(AppError::generic("Download cancelled"));
    }
    if !result.is_complete() {
        return Err(AppError::generic(format!(
            "{} of {} segments failed",
            result.failed,
            result.outcomes.len()
        )));
    }

    Ok(())
}

/// Reports segments a local manifest references but the directory lacks
///
/// # Errors
///
/// Returns an error if the manifest cannot be read or files are missing.
pub async fn handle_verify(args: VerifyArgs, global: &GlobalArgs) -> Result<()> {
    let config = AppConfig::load(global.config.as_deref()).await?;
    let classifier = LineClassifier::new(&config.manifest)?;
    let directory = args.resolved_directory();

    let missing = find_missing_segments(&args.manifest, &directory, &classifier).await?;

    if missing.is_empty() {
        if !global.quiet {
            println!("✅ All referenced files present in {}", directory.display());
        }
        return Ok(());
    }

    println!("Missing {} files:", missing.len());
    for name in &missing {
        println!("  • {}", name);
    }
    Err(AppError::generic(format!(
        "{} referenced files missing",
        missing.len()
    )))
}
