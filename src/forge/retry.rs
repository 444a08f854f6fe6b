//! forge::retry
//!
//! Bounded exponential backoff.
//!
//! Used at two levels: the HTTP transport retries a single request on
//! transient failures, and the workflow runner restarts the whole pipeline
//! after a branch conflict. Both share this policy type.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use article_sweep::forge::RetryPolicy;
//!
//! let policy = RetryPolicy::new(4, Duration::from_millis(100), Duration::from_millis(250));
//! assert_eq!(policy.delay_for(1), Duration::from_millis(100));
//! assert_eq!(policy.delay_for(2), Duration::from_millis(200));
//! assert_eq!(policy.delay_for(3), Duration::from_millis(250)); // capped
//! assert!(policy.allows_attempt(4));
//! assert!(!policy.allows_attempt(5));
//! ```

use std::time::Duration;

/// Retry limits and backoff delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Always at least 1.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Ceiling for any single delay.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Whether attempt number `attempt` (1-based) is within budget.
    pub fn allows_attempt(&self, attempt: u32) -> bool {
        attempt >= 1 && attempt <= self.max_attempts
    }

    /// Delay before retry number `retry` (1-based): doubles each time, capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.initial_backoff
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Whole milliseconds in `delay`, saturating at `u64::MAX`.
pub(crate) fn delay_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(4, Duration::from_millis(250), Duration::from_secs(4))
    }
}
