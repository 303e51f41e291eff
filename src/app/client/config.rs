//! HTTP client configuration and building logic
//!
//! Transport settings live in a per-client value rather than in process-wide
//! state, so two clients with different proxies can run side by side.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, REFERER};
use reqwest::{Client, Proxy};
use serde::{Deserialize, Serialize};

use crate::constants::http;
use crate::errors::{ConfigError, ConfigResult};

/// Configuration for the HTTP client used for manifests and segments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Whole-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// TCP keep-alive settings
    #[serde(with = "humantime_serde")]
    pub tcp_keepalive: Option<Duration>,
    /// Connection pool idle timeout
    #[serde(with = "humantime_serde")]
    pub pool_idle_timeout: Option<Duration>,
    /// Maximum number of idle connections per host
    pub pool_max_per_host: usize,
    /// User agent sent with every request
    pub user_agent: String,
    /// Proxy for all requests (http, https or socks5 URL)
    pub proxy: Option<String>,
    /// Referer header sent with every request
    pub referer: Option<String>,
    /// Extra request headers
    pub headers: BTreeMap<String, String>,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            tcp_keepalive: Some(http::TCP_KEEPALIVE),
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            user_agent: http::USER_AGENT.to_string(),
            proxy: None,
            referer: None,
            headers: BTreeMap::new(),
            rate_limit_rps: http::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

impl ClientConfig {
    /// Builds the HTTP client with the specified configuration
    pub fn build_http_client(&self) -> ConfigResult<Client> {
        let mut client_builder = Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.as_str())
            .tcp_nodelay(true)
            .pool_max_idle_per_host(self.pool_max_per_host)
            .default_headers(self.default_headers()?);

        if let Some(keepalive) = self.tcp_keepalive {
            client_builder = client_builder.tcp_keepalive(keepalive);
        }

        if let Some(idle_timeout) = self.pool_idle_timeout {
            client_builder = client_builder.pool_idle_timeout(idle_timeout);
        }

        if let Some(ref proxy_url) = self.proxy {
            let proxy = Proxy::all(proxy_url.as_str())
                .map_err(|e| ConfigError::invalid("client.proxy", proxy_url, e.to_string()))?;
            client_builder = client_builder.proxy(proxy);
        }

        client_builder
            .build()
            .map_err(|e| ConfigError::invalid("client", "builder", e.to_string()))
    }

    fn default_headers(&self) -> ConfigResult<HeaderMap> {
        let mut headers = HeaderMap::new();

        if let Some(ref referer) = self.referer {
            let value = HeaderValue::from_str(referer)
                .map_err(|e| ConfigError::invalid("client.referer", referer, e.to_string()))?;
            headers.insert(REFERER, value);
        }

        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ConfigError::invalid("client.headers", name, e.to_string()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| ConfigError::invalid("client.headers", value, e.to_string()))?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert!(config.proxy.is_none());
        assert!(config.headers.is_empty());
        assert_eq!(config.rate_limit_rps, http::DEFAULT_RATE_LIMIT_RPS);
        assert!(config.user_agent.starts_with("HLS-Fetcher/"));
    }

    #[test]
    fn test_http_client_creation() {
        let config = ClientConfig::default();
        assert!(config.build_http_client().is_ok());
    }

    #[test]
    fn test_http_client_with_proxy_and_referer() {
        let config = ClientConfig {
            proxy: Some("socks5://127.0.0.1:1080".to_string()),
            referer: Some("https://player.example.com".to_string()),
            ..Default::default()
        };

        assert!(config.build_http_client().is_ok());
    }

    #[test]
    fn test_invalid_header_rejected() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "value".to_string());
        let config = ClientConfig {
            headers,
            ..Default::default()
        };

        match config.build_http_client() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "client.headers"),
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_config_from_toml_uses_defaults_for_missing_fields() {
        let config: ClientConfig = toml::from_str(
            r#"
            request_timeout = "30s"
            referer = "https://player.example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, http::CONNECT_TIMEOUT);
        assert_eq!(config.referer.as_deref(), Some("https://player.example.com"));
    }
}
