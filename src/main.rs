//! HLS Fetcher CLI application
//!
//! Downloads an HLS manifest tree and its segments for local playback.

use std::process;

use tracing::info;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, EnvFilter};

use hls_fetcher::cli::{handle_download, handle_verify, Cli, Commands};
use hls_fetcher::config::{AppConfig, LoggingConfig};
use hls_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    // Configuration errors are reported by the command itself
    let logging = AppConfig::load(cli.global.config.as_deref())
        .await
        .map(|config| config.logging)
        .unwrap_or_default();
    init_logging(&cli, &logging);

    info!("HLS Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Download(args) => {
            info!("Executing download command");
            handle_download(args, &cli.global).await
        }
        Commands::Verify(args) => {
            info!("Executing verify command");
            handle_verify(args, &cli.global).await
        }
    }
}

/// Initialize logging from the verbosity flags, falling back to the
/// configured level
fn init_logging(cli: &Cli, logging: &LoggingConfig) {
    let level = match cli.requested_log_level() {
        Some(level) => level.to_string().to_lowercase(),
        None => logging.level.clone(),
    };

    // RUST_LOG, when set, takes precedence over flags and config
    let mut filter = EnvFilter::from_default_env();
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_none() {
        if let Ok(directive) = format!("hls_fetcher={}", level).parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .with_ansi(logging.colored_output)
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
