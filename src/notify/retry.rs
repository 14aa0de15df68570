//! Retry policy for push requests.

use std::time::Duration;

use crate::config::DeliveryConfig;

/// Delay to wait after failed attempt `attempt` (1-based): `base`,
/// `2 * base`, `4 * base`, ...
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor)
}

/// Bounded retries with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&DeliveryConfig::default())
    }
}

impl From<&DeliveryConfig> for RetryPolicy {
    fn from(config: &DeliveryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.backoff_base(),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt, or `None` when `attempt` was the
    /// last one allowed.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_attempts).then(|| backoff_delay(attempt, self.base_delay))
    }
}
