//! Configuration management for HLS Fetcher
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! a TOML file, and `HLS_FETCHER_*` environment variables. Command line
//! flags are applied on top by the binary.
//!
//! ```toml
//! [client]
//! request_timeout = "60s"
//! proxy = "socks5://127.0.0.1:1080"
//!
//! [retry]
//! max_attempts = 5
//! backoff = { kind = "exponential", initial = "250ms", max = "5s" }
//!
//! [pool]
//! worker_count = 16
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ClientConfig, CoordinatorConfig, ManifestConfig, RetryPolicy, WorkerConfig};
use crate::constants::{env, files};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfig,
    /// Per-segment retry policy
    pub retry: RetryPolicy,
    /// Worker pool sizing
    pub pool: WorkerConfig,
    /// Manifest parsing settings
    pub manifest: ManifestConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when neither RUST_LOG nor a flag is given
    pub level: String,
    /// Emit ANSI colours
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            colored_output: true,
        }
    }
}

impl AppConfig {
    /// Loads configuration from the first file found, then applies
    /// environment overrides
    ///
    /// An explicit `config_file_override` must exist; the default locations
    /// are optional.
    pub async fn load(config_file_override: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
                Self::load_from_file(path).await?
            }
            None => match Self::find_config_file() {
                Some(path) => Self::load_from_file(&path).await?,
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML configuration file
    pub async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::from_toml(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Parses TOML text
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Candidate configuration paths in lookup order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(files::LOCAL_CONFIG_FILE)];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join(files::CONFIG_DIR_NAME).join("config.toml"));
        }
        paths
    }

    fn find_config_file() -> Option<PathBuf> {
        let found = Self::search_paths().into_iter().find(|path| path.exists());
        if let Some(path) = &found {
            debug!("Found config file: {}", path.display());
        }
        found
    }

    /// Applies `HLS_FETCHER_*` variables from the process environment
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any key lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(env::WORKERS) {
            self.pool.worker_count = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(env::WORKERS, &value, "Expected a positive integer"))?;
            debug!("Worker count overridden to {}", self.pool.worker_count);
        }

        if let Some(value) = lookup(env::MAX_ATTEMPTS) {
            self.retry.max_attempts = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(env::MAX_ATTEMPTS, &value, "Expected a positive integer"))?;
            debug!("Max attempts overridden to {}", self.retry.max_attempts);
        }

        if let Some(value) = lookup(env::PROXY) {
            let value = value.trim();
            self.client.proxy = (!value.is_empty()).then(|| value.to_string());
        }

        Ok(())
    }

    /// Rejects values no session could run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.pool.worker_count == 0 {
            return Err(ConfigError::invalid(
                "pool.worker_count",
                self.pool.worker_count,
                "At least one worker is required",
            ));
        }
        if self.client.rate_limit_rps == 0 {
            return Err(ConfigError::invalid(
                "client.rate_limit_rps",
                self.client.rate_limit_rps,
                "Rate limit must be non-zero",
            ));
        }
        self.retry.validate()?;
        self.manifest.validate()?;
        Ok(())
    }

    /// Session configuration derived from these settings
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            worker: self.pool.clone(),
            retry: self.retry.clone(),
            manifest: self.manifest.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use crate::app::BackoffPolicy;

    fn overrides(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = AppConfig::from_toml(
            r#"
            [client]
            request_timeout = "30s"
            proxy = "socks5://127.0.0.1:1080"
            referer = "https://player.example.com/"

            [retry]
            max_attempts = 5
            backoff = { kind = "exponential", initial = "100ms", max = "2s" }

            [pool]
            worker_count = 12
            "#,
        )
        .unwrap();

        assert_eq!(config.client.request_timeout, Duration::from_secs(30));
        assert_eq!(config.client.proxy.as_deref(), Some("socks5://127.0.0.1:1080"));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(
            config.retry.backoff,
            BackoffPolicy::Exponential {
                initial: Duration::from_millis(100),
                max: Duration::from_secs(2),
            }
        );
        assert_eq!(config.pool.worker_count, 12);
        assert_eq!(config.manifest.manifest_suffix, "m3u8");
    }

    #[test]
    fn test_flat_backoff_parses() {
        let config = AppConfig::from_toml("[retry]\nbackoff = { kind = \"flat\" }\n").unwrap();
        assert_eq!(config.retry.backoff, BackoffPolicy::Flat);
    }

    #[test]
    fn test_invalid_toml_is_format_error() {
        let result = AppConfig::from_toml("[pool\nworker_count = ");
        assert!(matches!(result, Err(ConfigError::InvalidFormat(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars = overrides(&[
            (env::WORKERS, "3"),
            (env::MAX_ATTEMPTS, "7"),
            (env::PROXY, "http://proxy.local:8080"),
        ]);
        let mut config = AppConfig::default();
        config.apply_overrides_from(|key| vars.get(key).cloned()).unwrap();

        assert_eq!(config.pool.worker_count, 3);
        assert_eq!(config.retry.max_attempts, 7);
        assert_eq!(config.client.proxy.as_deref(), Some("http://proxy.local:8080"));
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let vars = overrides(&[(env::WORKERS, "many")]);
        let mut config = AppConfig::default();
        let result = config.apply_overrides_from(|key| vars.get(key).cloned());
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let mut config = AppConfig::default();
        config.pool.worker_count = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.client.rate_limit_rps = 0;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_explicit_missing_file_is_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("absent.toml");
        let result = AppConfig::load(Some(path.as_path())).await;
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        tokio::fs::write(&path, "[pool]\nworker_count = 4\n").await.unwrap();

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.pool.worker_count, 4);
        assert_eq!(config.coordinator_config().worker.worker_count, 4);
    }
}
