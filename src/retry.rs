//! Bounded retry for outbound HTTP calls.
//!
//! Both the quote fetcher and the Telegram notifier run every request
//! through a `RetryPolicy`: a fixed number of attempts with an optional
//! fixed pause in between. The operation decides what counts as failure
//! (a non-success status is an `Err`).

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::ZERO)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self::new(cfg.max_attempts, Duration::from_millis(cfg.backoff_ms))
    }
}

/// Every attempt failed. Carries the last error.
#[derive(Debug, thiserror::Error)]
#[error("{label} failed after {attempts} attempts: {last_error:#}")]
pub struct RetryExhausted {
    pub label: String,
    pub attempts: u32,
    pub last_error: anyhow::Error,
}

impl RetryPolicy {
    /// At least one attempt is always made.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 && !self.backoff.is_zero() {
                debug!(label, attempt, delay_ms = self.backoff.as_millis() as u64, "Retrying");
                tokio::time::sleep(self.backoff).await;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(label, attempt, max_attempts = self.max_attempts, error = %e, "Attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(RetryExhausted {
            label: label.to_string(),
            attempts: self.max_attempts,
            last_error: last_error.unwrap_or_else(|| anyhow::anyhow!("no attempts made")),
        })
    }
}
