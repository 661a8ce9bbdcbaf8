//! Retry policy for remote automation actions.
//!
//! Exponential backoff with full jitter, capped. The attempt budget comes
//! from the rule's `max_attempts`; this module only owns the delays.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Base delay between attempts in milliseconds.
    pub base_delay_ms: u64,
    /// Delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Whether to apply full jitter.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Creates the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Disables jitter (deterministic delays, mainly for tests).
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Delay before retrying after `attempt` (0-indexed) failed.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(self.max_delay_ms);
        let millis = if self.jitter && exp > 0 {
            rand::thread_rng().gen_range(0..=exp)
        } else {
            exp
        };
        Duration::from_millis(millis)
    }
}

/// Runs `operation` up to `max_attempts` times, sleeping between attempts.
///
/// Returns the first success, or the last error with the attempts used.
///
/// # Errors
///
/// The terminal error after the budget is exhausted, paired with the number
/// of attempts made.
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    max_attempts: u32,
    mut operation: F,
) -> Result<(T, u32), (E, u32)>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let budget = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok((value, attempt + 1)),
            Err(error) => {
                attempt += 1;
                if attempt >= budget {
                    return Err((error, attempt));
                }
                let delay = config.delay_for_attempt(attempt - 1);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "retrying automation action"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
