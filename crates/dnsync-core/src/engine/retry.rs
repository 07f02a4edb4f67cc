//! Retry with exponential backoff
//!
//! Retries are local to one provider call. Only errors for which
//! [`Error::is_retryable`] holds are retried; everything else is returned
//! after the first attempt.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::EngineConfig;
use crate::error::{Error, Result};

/// Upper bound for a single backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Result of a retried call, with the number of attempts it took
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T>,
    pub attempts: usize,
}

/// Exponential backoff policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: usize,
    /// Sleep before the first retry
    pub base_delay: Duration,
    /// Growth factor between consecutive sleeps
    pub multiplier: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, multiplier: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            multiplier: multiplier.max(1),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            config.backoff_multiplier,
        )
    }

    /// Sleep before retrying after `failed_attempt` (1-based) failed
    ///
    /// `base * multiplier^(failed_attempt - 1)`, capped at one minute.
    pub fn delay_before_retry(&self, failed_attempt: usize) -> Duration {
        let exponent = u32::try_from(failed_attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        let factor = self.multiplier.saturating_pow(exponent);
        self.base_delay.saturating_mul(factor).min(MAX_BACKOFF)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Attempted<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => {
                    return Attempted {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_before_retry(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                        label, attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Attempted {
                        result: Err(e),
                        attempts: attempt,
                    };
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Turn an exhausted transient failure into a readable cause
pub(crate) fn describe_failure(error: &Error, attempts: usize) -> String {
    if error.is_retryable() {
        format!("{} (gave up after {} attempts)", error, attempts)
    } else {
        error.to_string()
    }
}
