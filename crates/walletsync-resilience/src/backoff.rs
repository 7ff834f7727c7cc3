//! Exponential backoff
//!
//! Retry delays that grow exponentially, with optional jitter, and an
//! executor that retries only transient errors.

use rand::Rng;
use std::time::Duration;
use walletsync_error::{Result, SyncError};

/// Backoff strategy configuration
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
    /// Multiplier for each retry (typically 2.0)
    pub multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter: f64,
    /// Maximum number of retries (not counting the initial attempt)
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.2,
            max_attempts: 5,
        }
    }
}

impl BackoffConfig {
    /// Create a new backoff config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Set jitter factor (0.0 to 1.0)
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Set maximum retries
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Preset used by the wallet gateway: up to 3 retries at 2s, 4s, 8s with
    /// no jitter, matching the backend's documented retry ladder.
    pub fn gateway() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.0,
            max_attempts: 3,
        }
    }
}

/// Exponential backoff iterator; yields the delay before each retry.
pub struct ExponentialBackoff {
    config: BackoffConfig,
    attempt: u32,
    current_delay: Duration,
}

impl ExponentialBackoff {
    /// Create a new backoff instance
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            current_delay: config.initial_delay,
            config,
            attempt: 0,
        }
    }

    /// Get the number of retries already consumed
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Check if more retries are allowed
    pub fn can_retry(&self) -> bool {
        self.attempt < self.config.max_attempts
    }

    /// Reset the backoff state
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.current_delay = self.config.initial_delay;
    }

    fn delay_with_jitter(&self, base_delay: Duration) -> Duration {
        let jitter_range = base_delay.as_secs_f64() * self.config.jitter;
        if jitter_range <= 0.0 {
            return base_delay;
        }
        let mut rng = rand::thread_rng();
        let jitter = rng.gen_range(-jitter_range..jitter_range);
        Duration::from_secs_f64((base_delay.as_secs_f64() + jitter).max(0.0))
    }
}

impl Iterator for ExponentialBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.can_retry() {
            return None;
        }

        let delay = self
            .delay_with_jitter(self.current_delay)
            .min(self.config.max_delay);

        self.attempt += 1;
        self.current_delay = Duration::from_secs_f64(
            (self.current_delay.as_secs_f64() * self.config.multiplier)
                .min(self.config.max_delay.as_secs_f64()),
        );

        Some(delay)
    }
}

/// Execute an operation, retrying transient failures with backoff.
///
/// Errors where [`SyncError::is_retryable`] is false (HTTP rejections, skip
/// decisions, validation) are returned immediately. When the retry budget is
/// exhausted the last transport error is wrapped in
/// [`SyncError::RetriesExhausted`].
pub async fn retry_with_backoff<F, Fut, T>(config: &BackoffConfig, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut backoff = ExponentialBackoff::new(config.clone());

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => match backoff.next() {
                Some(delay) => {
                    tracing::debug!(
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return Err(SyncError::RetriesExhausted {
                        attempts: backoff.attempt() + 1,
                        last: e.to_string(),
                    });
                }
            },
        }
    }
}
