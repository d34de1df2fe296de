//! Exponential backoff policy.
//!
//! `delay(attempt) = base_delay * 2^attempt`, where `attempt` counts the
//! connection attempts that already failed since the last successful open.
//! The first retry uses `attempt = 0` and waits exactly `base_delay`.
//!
//! There is no jitter and no ceiling on the delay value. Only the number of
//! retries is capped, so the wait before the last permitted retry is
//! `base_delay * 2^(max_attempts - 1)`.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default retry budget.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

// ============================================================================
// BackoffPolicy
// ============================================================================

/// Doubling retry delay with a bounded number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    base_delay: Duration,
    /// Number of retries allowed before giving up.
    max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS)
    }
}

impl BackoffPolicy {
    /// Creates a policy.
    ///
    /// The values are checked by [`validate`](Self::validate) when the policy
    /// is handed to a connection manager.
    #[inline]
    #[must_use]
    pub const fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
        }
    }

    /// Returns the delay before the first retry.
    #[inline]
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns the retry budget.
    #[inline]
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Checks that the policy allows at least one retry after a positive delay.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `max_attempts` or `base_delay` is zero
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::config("max_attempts must be > 0"));
        }
        if self.base_delay.is_zero() {
            return Err(Error::config("base_delay must be > 0"));
        }
        Ok(())
    }

    /// Delay to wait after `attempt` failures.
    ///
    /// Saturates at [`Duration::MAX`].
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        match 1u32.checked_shl(attempt) {
            Some(factor) => self.base_delay.saturating_mul(factor),
            None if self.base_delay.is_zero() => Duration::ZERO,
            None => Duration::MAX,
        }
    }

    /// Returns `true` if another retry is allowed after `attempt` failures.
    #[inline]
    #[must_use]
    pub const fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Every delay the budget allows, in order.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_attempts).map(|attempt| self.delay(attempt))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_default_schedule() {
        let policy = BackoffPolicy::default();
        let millis: Vec<u128> = policy.schedule().map(|d| d.as_millis()).collect();
        assert_eq!(
            millis,
            vec![
                1000, 2000, 4000, 8000, 16000, 32000, 64000, 128000, 256000, 512000
            ]
        );
    }

    #[test]
    fn test_first_retry_uses_base_delay() {
        let policy = BackoffPolicy::new(Duration::from_millis(250), 3);
        assert_eq!(policy.delay(0), Duration::from_millis(250));
    }

    #[test]
    fn test_allows_retry() {
        let policy = BackoffPolicy::new(DEFAULT_BASE_DELAY, 2);
        assert!(policy.allows_retry(0));
        assert!(policy.allows_retry(1));
        assert!(!policy.allows_retry(2));
        assert!(!policy.allows_retry(3));
    }

    #[test]
    fn test_validate() {
        assert!(BackoffPolicy::default().validate().is_ok());

        let err = BackoffPolicy::new(DEFAULT_BASE_DELAY, 0)
            .validate()
            .unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("max_attempts"));

        let err = BackoffPolicy::new(Duration::ZERO, 3).validate().unwrap_err();
        assert!(err.to_string().contains("base_delay"));
    }

    #[test]
    fn test_delay_saturates() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(32), Duration::MAX);
        assert_eq!(policy.delay(u32::MAX), Duration::MAX);
        assert_eq!(
            BackoffPolicy::new(Duration::ZERO, 1).delay(40),
            Duration::ZERO
        );
    }

    proptest! {
        #[test]
        fn prop_delay_doubles(base_ms in 1u64..10_000, attempt in 0u32..20) {
            let policy = BackoffPolicy::new(Duration::from_millis(base_ms), 20);
            prop_assert_eq!(
                policy.delay(attempt),
                Duration::from_millis(base_ms * (1u64 << attempt))
            );
            prop_assert_eq!(policy.delay(attempt + 1), policy.delay(attempt) * 2);
        }

        #[test]
        fn prop_schedule_length_matches_budget(max in 0u32..30) {
            let policy = BackoffPolicy::new(DEFAULT_BASE_DELAY, max);
            prop_assert_eq!(policy.schedule().count(), max as usize);
        }
    }
}
