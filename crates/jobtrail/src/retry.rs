//! Bounded exponential backoff, configured per operation.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryPolicySettings;

/// How many times to attempt an operation and how long to wait in between.
///
/// Delay before retry `n` (1-based) is `base * 2^(n-1)`, capped at `max`,
/// then spread by `±jitter` of itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: base_delay.saturating_mul(16),
            jitter: 0.0,
        }
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// A policy that never retries.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay to wait after `failed_attempts` failures, or `None` when the
    /// budget is spent.
    pub fn backoff(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts == 0 || failed_attempts >= self.max_attempts {
            return None;
        }
        let exponent = (failed_attempts - 1).min(16);
        let raw = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);
        Some(self.apply_jitter(raw))
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.jitter <= 0.0 || delay.is_zero() {
            return delay;
        }
        let factor = rand::thread_rng().gen_range((1.0 - self.jitter)..=(1.0 + self.jitter));
        delay.mul_f64(factor)
    }

    /// Runs a synchronous operation until it succeeds, fails with an error
    /// `is_retryable` rejects, or the attempt budget is spent. Sleeps
    /// between attempts without blocking the runtime.
    pub async fn run<T, E, F, R>(&self, label: &str, is_retryable: R, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut failed = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    failed += 1;
                    let delay = if is_retryable(&e) {
                        self.backoff(failed)
                    } else {
                        None
                    };
                    match delay {
                        Some(delay) => {
                            log::warn!(
                                "{} failed (attempt {}/{}): {}; retrying in {:?}",
                                label,
                                failed,
                                self.max_attempts,
                                e,
                                delay
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => return Err(e),
                    }
                }
            }
        }
    }
}

impl From<&RetryPolicySettings> for RetryPolicy {
    fn from(settings: &RetryPolicySettings) -> Self {
        RetryPolicy::new(
            settings.max_attempts,
            Duration::from_millis(settings.base_delay_ms),
        )
        .with_max_delay(Duration::from_millis(settings.max_delay_ms))
        .with_jitter(settings.jitter)
    }
}
