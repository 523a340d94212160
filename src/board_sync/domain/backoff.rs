//! Bounded exponential backoff for board calls.

use crate::config::BoardSyncConfig;
use std::time::Duration;

/// Retry schedule for board operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the second attempt.
    pub base: Duration,
    /// Upper bound on any single delay.
    pub cap: Duration,
    /// Total attempts including the first.
    pub max_attempts: u32,
}

impl BackoffPolicy {
    /// Returns the delay after failed attempt number `attempt` (1-based).
    ///
    /// Doubles from `base` and saturates at `cap`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base
            .checked_mul(1_u32 << exponent)
            .map_or(self.cap, |delay| delay.min(self.cap))
    }

    /// Returns whether another attempt is allowed after `attempt` failures.
    #[must_use]
    pub const fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&BoardSyncConfig::default())
    }
}

impl From<&BoardSyncConfig> for BackoffPolicy {
    fn from(config: &BoardSyncConfig) -> Self {
        Self {
            base: Duration::from_millis(config.backoff_base_ms),
            cap: Duration::from_millis(config.backoff_cap_ms),
            max_attempts: config.max_attempts,
        }
    }
}
