//! Retry with exponential backoff.
//!
//! Attempt `n` (0-indexed) waits `base_delay * exponential_base^n` before the next
//! attempt. Jitter and a delay cap are available but off by default so the client's
//! documented schedule (`retry_delay * 2^attempt`) holds exactly.

use crate::config::RpcClientConfig;
use crate::error::RpcError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy for one logical call.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one. Never less than 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Upper bound on a single delay, if any.
    pub max_delay: Option<Duration>,
    pub exponential_base: f64,
    /// Multiply each delay by a random factor in `0.5..1.5`.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: None,
            exponential_base: 2.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy matching a client configuration: one attempt plus `retry_attempts` retries.
    pub fn from_client(config: &RpcClientConfig) -> Self {
        Self::new()
            .with_max_attempts(config.retry_attempts.saturating_add(1))
            .with_base_delay(config.retry_delay)
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to wait after the failed attempt `attempt` (0-indexed).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let multiplier = self.exponential_base.powi(attempt as i32);
        let mut secs = self.base_delay.as_secs_f64() * multiplier;

        if self.jitter {
            let mut rng = rand::rng();
            secs *= rng.random_range(0.5..1.5);
        }
        if let Some(max) = self.max_delay {
            secs = secs.min(max.as_secs_f64());
        }

        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

/// What happened across the attempts of one call.
#[derive(Debug, Clone, Default)]
pub struct RetryStats {
    pub attempts: u32,
    pub total_delay: Duration,
    pub success: bool,
    pub last_error: Option<RpcError>,
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or the
/// attempts run out. The last error observed is returned.
pub async fn retry_async<F, Fut, T>(
    config: &RetryConfig,
    mut operation: F,
) -> (Result<T, RpcError>, RetryStats)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, RpcError>>,
{
    let mut stats = RetryStats::default();
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        stats.attempts = attempt + 1;

        let error = match operation(attempt).await {
            Ok(value) => {
                stats.success = true;
                if attempt > 0 {
                    debug!("Call succeeded after {} attempts", attempt + 1);
                }
                return (Ok(value), stats);
            }
            Err(e) => e,
        };

        stats.last_error = Some(error.clone());

        if !error.is_retryable() {
            debug!("Error is not retryable: {}", error);
            return (Err(error), stats);
        }
        if attempt + 1 >= max_attempts {
            warn!(
                "All {} attempts exhausted. Last error: {}",
                max_attempts, error
            );
            return (Err(error), stats);
        }

        let delay = config.calculate_delay(attempt);
        stats.total_delay += delay;
        warn!(
            "Attempt {}/{} failed: {}. Retrying in {:?}",
            attempt + 1,
            max_attempts,
            error,
            delay
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
