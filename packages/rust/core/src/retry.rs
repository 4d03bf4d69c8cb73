//! Retry policy for oracle calls.
//!
//! Exponential backoff: the wait before retry `n` (0-based) is
//! `base_delay * 2^n`, capped at `max_delay`. Rate-limited responses wait
//! one extra `base_delay` on top.

use std::time::Duration;

use footprint_shared::OracleConfig;

/// Configuration for retry behavior on transient oracle failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial one).
    pub max_attempts: u32,
    /// Initial delay before the first retry.
    pub base_delay: Duration,
    /// Maximum delay between retries (backoff is capped here).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(16),
        }
    }
}

impl From<&OracleConfig> for RetryConfig {
    fn from(config: &OracleConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay,
            max_delay: config.max_delay,
        }
    }
}

/// Why an attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// HTTP 429.
    RateLimited,
    /// Network error, non-success status, or an unusable reply.
    Transient,
}

impl RetryConfig {
    /// Delay before retrying after failed attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32, kind: FailureKind) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let backoff = self.base_delay.saturating_mul(factor).min(self.max_delay);
        match kind {
            FailureKind::RateLimited => backoff.saturating_add(self.base_delay),
            FailureKind::Transient => backoff,
        }
    }

    /// Whether another attempt follows failed attempt `attempt` (0-based).
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}
