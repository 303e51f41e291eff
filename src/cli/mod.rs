//! Command-line interface components
//!
//! Argument parsing, command handlers, and progress display for the
//! `hls_fetcher` binary.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{Cli, Commands, DownloadArgs, GlobalArgs, VerifyArgs};
pub use commands::{handle_download, handle_verify};
pub use progress::{ProgressDisplay, ProgressTally};
