//! Retry policy for segment fetches
//!
//! A policy bounds the number of attempts and chooses the delay between
//! them. `Flat` retries immediately; `Exponential` doubles the delay from
//! `initial` up to `max` using the `backoff` crate's schedule without jitter.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::retry;
use crate::errors::{ConfigError, ConfigResult, FetchResult};

/// Delay between failed attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffPolicy {
    /// Retry immediately
    Flat,
    /// Capped exponential delay
    Exponential {
        #[serde(with = "humantime_serde")]
        initial: Duration,
        #[serde(with = "humantime_serde")]
        max: Duration,
    },
}

/// Attempt budget and pacing for one fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay schedule between attempts
    pub backoff: BackoffPolicy,
    /// Deadline for a single attempt
    #[serde(with = "humantime_serde")]
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: retry::DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffPolicy::Exponential {
                initial: retry::DEFAULT_INITIAL_BACKOFF,
                max: retry::DEFAULT_MAX_BACKOFF,
            },
            attempt_timeout: Some(retry::DEFAULT_ATTEMPT_TIMEOUT),
        }
    }
}

impl RetryPolicy {
    /// Immediate retries with no per-attempt deadline
    pub fn flat(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: BackoffPolicy::Flat,
            attempt_timeout: None,
        }
    }

    /// Builder-style override of the attempt deadline
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Validates the policy
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "retry.max_attempts",
                self.max_attempts,
                "At least one attempt is required",
            ));
        }

        if let BackoffPolicy::Exponential { initial, max } = self.backoff {
            if initial > max {
                return Err(ConfigError::invalid(
                    "retry.backoff.initial",
                    format!("{:?}", initial),
                    format!("Must not exceed retry.backoff.max ({:?})", max),
                ));
            }
        }

        if self.attempt_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::invalid(
                "retry.attempt_timeout",
                "0s",
                "Attempt timeout must be positive",
            ));
        }

        Ok(())
    }

    fn schedule(&self) -> DelaySchedule {
        match self.backoff {
            BackoffPolicy::Flat => DelaySchedule::Flat,
            BackoffPolicy::Exponential { initial, max } => DelaySchedule::Exponential(
                ExponentialBackoffBuilder::new()
                    .with_initial_interval(initial)
                    .with_max_interval(max)
                    .with_multiplier(2.0)
                    .with_randomization_factor(0.0)
                    .with_max_elapsed_time(None)
                    .build(),
            ),
        }
    }
}

enum DelaySchedule {
    Flat,
    Exponential(ExponentialBackoff),
}

impl DelaySchedule {
    fn next_delay(&mut self) -> Duration {
        match self {
            DelaySchedule::Flat => Duration::ZERO,
            DelaySchedule::Exponential(schedule) => schedule.next_backoff().unwrap_or_default(),
        }
    }
}

/// Runs `attempt` until it succeeds or the policy is exhausted
///
/// The closure receives the 1-based attempt number. Errors that are not
/// retryable end the loop immediately. When every attempt fails, the error
/// from the last attempt is returned.
pub async fn retry_with_policy<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut attempt: F,
) -> FetchResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = FetchResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut schedule = policy.schedule();
    let mut attempt_number = 1;

    loop {
        match attempt(attempt_number).await {
            Ok(value) => {
                if attempt_number > 1 {
                    debug!("{} succeeded on attempt {}", label, attempt_number);
                }
                return Ok(value);
            }
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt_number >= max_attempts => {
                warn!("{} failed after {} attempts: {}", label, attempt_number, e);
                return Err(e);
            }
            Err(e) => {
                let delay = schedule.next_delay();
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {}ms",
                    label,
                    attempt_number,
                    max_attempts,
                    e,
                    delay.as_millis()
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt_number += 1;
            }
        }
    }
}
