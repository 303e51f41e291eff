//! Application constants for HLS Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names for configuration overrides
pub mod env {
    /// Overrides the worker pool capacity
    pub const WORKERS: &str = "HLS_FETCHER_WORKERS";

    /// Overrides the per-segment attempt budget
    pub const MAX_ATTEMPTS: &str = "HLS_FETCHER_MAX_ATTEMPTS";

    /// Overrides the HTTP proxy URL
    pub const PROXY: &str = "HLS_FETCHER_PROXY";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("HLS-Fetcher/", env!("CARGO_PKG_VERSION"));

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

    /// TCP keep-alive interval
    pub const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 16;

    /// Default request rate limit (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 50;
}

/// Retry configuration
pub mod retry {
    use super::Duration;

    /// Attempts per segment before giving up
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// First delay of the exponential policy
    pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(250);

    /// Upper bound on any single backoff delay
    pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(5);

    /// Deadline for one fetch attempt, on top of the client's own timeout
    pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(120);
}

/// Worker pool configuration
pub mod workers {
    /// Default number of concurrent segment downloads
    pub const DEFAULT_WORKER_COUNT: usize = 8;

    /// Maximum recommended concurrent workers
    pub const MAX_WORKER_COUNT: usize = 64;

    /// Channel buffer size for progress events
    pub const PROGRESS_BUFFER_SIZE: usize = 256;
}

/// Manifest parsing constants
pub mod manifest {
    /// Default media segment suffix
    pub const DEFAULT_SEGMENT_SUFFIXES: &[&str] = &["ts"];

    /// Default playlist suffix
    pub const DEFAULT_MANIFEST_SUFFIX: &str = "m3u8";

    /// Comment and directive prefix
    pub const DIRECTIVE_PREFIX: char = '#';

    /// Base used to encode references the way resolved URLs are encoded
    pub const LOCAL_NAME_BASE: &str = "http://localhost/";
}

/// File operation constants
pub mod files {
    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Project-local configuration file name
    pub const LOCAL_CONFIG_FILE: &str = "hls-fetcher.toml";

    /// Directory name under the user config directory
    pub const CONFIG_DIR_NAME: &str = "hls-fetcher";
}

// Re-export commonly used constants for convenience
pub use files::TEMP_FILE_SUFFIX;
pub use http::{DEFAULT_RATE_LIMIT_RPS, USER_AGENT};
pub use retry::DEFAULT_MAX_ATTEMPTS;
pub use workers::DEFAULT_WORKER_COUNT;
