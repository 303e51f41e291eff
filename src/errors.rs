//! Error types for HLS Fetcher
//!
//! Each component has its own error enum; [`AppError`] wraps them all for
//! callers that only need a single type. Errors carry the URL or path they
//! concern so a log line is enough to act on.

use std::path::PathBuf;
use thiserror::Error;

/// Single-URL retrieval errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection, DNS, TLS or body-read failure
    #[error("Transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("HTTP {code} fetching {url}")]
    HttpStatus { url: String, code: u16 },

    /// Attempt exceeded its deadline
    #[error("Fetching {url} timed out after {seconds} seconds")]
    Timeout { url: String, seconds: u64 },

    /// The batch was cancelled before or during the attempt
    #[error("Fetching {url} was cancelled")]
    Cancelled { url: String },

    /// URL could not be parsed
    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    /// URL path has no final component to name the local file after
    #[error("Cannot derive a file name from {url}")]
    MissingFileName { url: String },

    /// I/O error during file operations
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Atomic rename failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },
}

impl FetchError {
    /// Whether another attempt might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Transport { .. } | FetchError::HttpStatus { .. } | FetchError::Timeout { .. }
        )
    }
}

/// Manifest resolution and rewriting errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Root or nested manifest could not be retrieved
    #[error("Manifest unavailable: {url}")]
    Unavailable {
        url: String,
        #[source]
        source: FetchError,
    },

    /// A nested reference points back into the current resolution chain
    #[error("Cyclic manifest reference: {url}")]
    Cyclic { url: String },

    /// Line could not be classified (strict mode only)
    #[error("Malformed manifest at line {line}: {content}")]
    Malformed { line: usize, content: String },

    /// Manifest or reference URL could not be parsed
    #[error("Invalid manifest URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Two different segments or manifests would be written to the same local file
    #[error("File name collision on {file_name}: {first} and {second}")]
    NameCollision {
        file_name: String,
        first: String,
        second: String,
    },

    /// I/O error reading or writing a local manifest
    #[error("Manifest I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Worker pool errors
#[derive(Error, Debug)]
pub enum PoolError {
    /// Capacity must be at least one
    #[error("Invalid worker pool capacity: {capacity}")]
    InvalidCapacity { capacity: usize },

    /// Submission after the pool stopped accepting work
    #[error("Worker pool is closed")]
    Closed,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Configuration file could not be read
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Fetch error
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Manifest error
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Pool error
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Fetch(e) => e.is_retryable(),
            AppError::Manifest(ManifestError::Unavailable { source, .. }) => source.is_retryable(),
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Fetch(_) => "fetch",
            AppError::Manifest(_) => "manifest",
            AppError::Pool(_) => "pool",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Fetch result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Manifest result type alias
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;

/// Pool result type alias
pub type PoolResult<T> = std::result::Result<T, PoolError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let status = FetchError::HttpStatus {
            url: "https://cdn.example/seg1.ts".to_string(),
            code: 503,
        };
        assert!(status.is_retryable());

        let cancelled = FetchError::Cancelled {
            url: "https://cdn.example/seg1.ts".to_string(),
        };
        assert!(!cancelled.is_retryable());

        let io = FetchError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(!io.is_retryable());
    }

    #[test]
    fn test_app_error_category() {
        let err = AppError::from(ManifestError::Cyclic {
            url: "https://cdn.example/a.m3u8".to_string(),
        });
        assert_eq!(err.category(), "manifest");
        assert!(!err.is_recoverable());

        let unavailable = AppError::from(ManifestError::Unavailable {
            url: "https://cdn.example/a.m3u8".to_string(),
            source: FetchError::HttpStatus {
                url: "https://cdn.example/a.m3u8".to_string(),
                code: 502,
            },
        });
        assert!(unavailable.is_recoverable());
    }

    #[test]
    fn test_error_messages_name_the_url() {
        let err = FetchError::HttpStatus {
            url: "https://cdn.example/seg9.ts".to_string(),
            code: 404,
        };
        assert_eq!(err.to_string(), "HTTP 404 fetching https://cdn.example/seg9.ts");
    }
}
