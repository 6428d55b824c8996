//! Exponential backoff for failed ad loads
//!
//! The delay for the n-th consecutive failure is `base * 2^min(n, max_exponent)`.
//! With the defaults (1s base, exponent capped at 6) consecutive failures wait
//! 2, 4, 8, 16, 32, 64, 64, ... seconds.

use crate::config::RetryConfig;
use std::time::Duration;

/// Backoff policy shared by all ad formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    base_delay_ms: u64,
    max_exponent: u32,
}

impl RetryPolicy {
    /// Create new policy
    pub fn new(base_delay_ms: u64, max_exponent: u32) -> Self {
        Self {
            base_delay_ms,
            max_exponent,
        }
    }

    /// Base delay in milliseconds
    pub fn base_delay_ms(&self) -> u64 {
        self.base_delay_ms
    }

    /// Largest exponent applied to the base delay
    pub fn max_exponent(&self) -> u32 {
        self.max_exponent
    }

    /// Longest delay this policy will ever produce
    pub fn max_delay(&self) -> Duration {
        self.delay_for_attempt(self.max_exponent)
    }

    /// Delay before retrying, given the already-incremented attempt counter
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        // 2^63 would overflow the multiplier
        let shift = attempt.min(self.max_exponent).min(62);
        let multiplier = 1_u64 << shift;
        Duration::from_millis(self.base_delay_ms.saturating_mul(multiplier))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1_000, 6)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.base_delay_ms, config.max_exponent)
    }
}

/// Consecutive-failure counter paired with a policy
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    attempt: u32,
}

impl Backoff {
    /// Create new backoff tracker
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Current attempt counter (0 after a success)
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Record a failure and return the delay before the next load
    pub fn record_failure(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        self.policy.delay_for_attempt(self.attempt)
    }

    /// Record a success
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_sequence() {
        let mut backoff = Backoff::new(RetryPolicy::default());
        let delays: Vec<u64> = (0..9).map(|_| backoff.record_failure().as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 8, 16, 32, 64, 64, 64, 64]);
        assert_eq!(backoff.attempt(), 9);
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut backoff = Backoff::new(RetryPolicy::default());
        backoff.record_failure();
        backoff.record_failure();
        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.record_failure(), Duration::from_secs(2));
    }

    #[test]
    fn test_custom_base() {
        let policy = RetryPolicy::new(250, 3);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_millis(2_000));
        assert_eq!(policy.max_delay(), Duration::from_millis(2_000));
    }

    #[test]
    fn test_huge_exponent_does_not_overflow() {
        let policy = RetryPolicy::new(u64::MAX, 200);
        assert_eq!(policy.delay_for_attempt(u32::MAX), Duration::from_millis(u64::MAX));
    }

    proptest! {
        #[test]
        fn prop_delay_is_monotonic_and_capped(attempt in 0u32..10_000) {
            let policy = RetryPolicy::default();
            let delay = policy.delay_for_attempt(attempt);
            let next = policy.delay_for_attempt(attempt + 1);
            prop_assert!(delay <= next);
            prop_assert!(next <= Duration::from_secs(64));
        }

        #[test]
        fn prop_delay_matches_power_of_two(attempt in 0u32..=6) {
            let policy = RetryPolicy::default();
            prop_assert_eq!(
                policy.delay_for_attempt(attempt),
                Duration::from_secs(1u64 << attempt)
            );
        }
    }
}
