//! Core HTTP operations with rate limiting
//!
//! Every request goes through one `governor` rate limiter shared by the
//! client. This layer performs exactly one attempt per call; retries are
//! decided by the caller.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Jitter, Quota, RateLimiter};
use reqwest::Client;
use url::Url;

use crate::errors::{ConfigError, ConfigResult, FetchError, FetchResult};

/// HTTP operations handler
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limit
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the rate limit is zero
    pub fn new(client: Client, rate_limit_rps: u32) -> ConfigResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> ConfigResult<RateLimiter<NotKeyed, InMemoryState, DefaultClock>> {
        let rps = NonZeroU32::new(rate_limit_rps).ok_or_else(|| {
            ConfigError::invalid("client.rate_limit_rps", rate_limit_rps, "Rate limit must be non-zero")
        })?;
        Ok(RateLimiter::direct(Quota::per_second(rps)))
    }

    /// Issues a single GET and checks the status code
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Transport` if the request could not be completed
    /// and `FetchError::HttpStatus` for any non-2xx response.
    pub async fn get(&self, url: &Url) -> FetchResult<reqwest::Response> {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(20)))
            .await;

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("GET {} returned {}", url, status);
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                code: status.as_u16(),
            });
        }

        Ok(response)
    }

    /// Fetches the full response body as bytes
    pub async fn get_bytes(&self, url: &Url) -> FetchResult<Vec<u8>> {
        let response = self.get(url).await?;
        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;
        tracing::debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }

    /// Fetches the full response body as text
    pub async fn get_text(&self, url: &Url) -> FetchResult<String> {
        let response = self.get(url).await?;
        response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }
}
