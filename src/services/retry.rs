//! Retry with exponential backoff and jitter

use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::{
    config::Config,
    error::{AppError, AppResult},
};

/// Upper bound on a single wait, whatever the provider asks for
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Decides how often and how long to retry a failing provider call
#[derive(Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, the first call included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
    /// Random extra wait added to each delay, drawn from `0..=max_jitter`
    pub max_jitter: Duration,
    /// Errors for which another attempt is worthwhile
    pub retryable: fn(&AppError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2,
            max_jitter: Duration::from_millis(250),
            retryable: AppError::is_transient_rate_limit,
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("multiplier", &self.multiplier)
            .field("max_jitter", &self.max_jitter)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.retry_max_attempts,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_jitter: Duration::from_millis(config.retry_max_jitter_ms),
            ..Self::default()
        }
    }

    pub fn without_jitter(self) -> Self {
        Self {
            max_jitter: Duration::ZERO,
            ..self
        }
    }

    /// Backoff before the attempt following `failed_attempt` (1-based), jitter excluded
    pub fn backoff(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1);
        let factor = self.multiplier.saturating_pow(exponent);
        self.base_delay.saturating_mul(factor).min(MAX_DELAY)
    }

    /// Full wait: backoff plus jitter, never shorter than the provider's `retry-after`
    pub fn delay_for(&self, failed_attempt: u32, error: &AppError) -> Duration {
        let mut delay = self.backoff(failed_attempt) + self.jitter();

        if let AppError::RateLimited(info) = error {
            if let Some(secs) = info.retry_after {
                delay = delay.max(Duration::from_secs(secs).min(MAX_DELAY));
            }
        }

        delay
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or attempts run out
    pub async fn run<T, F, Fut>(&self, mut op: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && (self.retryable)(&e) => {
                    let delay = self.delay_for(attempt, &e);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying after rate limit"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
