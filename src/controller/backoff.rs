//! # Exponential Backoff
//!
//! Per-key exponential backoff used by the work queue when an item is re-added
//! after a transient failure.
//!
//! Each consecutive failure of the same key doubles the delay, starting at the
//! base delay and capped at the maximum. Forgetting a key resets its sequence.
//!
//! ## Usage
//!
//! ```rust
//! use repository_controller::controller::backoff::ExponentialBackoff;
//! use std::time::Duration;
//!
//! let mut backoff = ExponentialBackoff::new(Duration::from_millis(5), Duration::from_secs(1000));
//! assert_eq!(backoff.when("default/repo"), Duration::from_millis(5));
//! assert_eq!(backoff.when("default/repo"), Duration::from_millis(10));
//! assert_eq!(backoff.when("default/repo"), Duration::from_millis(20));
//! assert_eq!(backoff.num_requeues("default/repo"), 3);
//! ```

use std::collections::HashMap;
use std::time::Duration;

/// Per-key exponential backoff calculator
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
    /// Consecutive failures per key
    failures: HashMap<String, u32>,
}

impl ExponentialBackoff {
    /// Create a backoff starting at `base` and never exceeding `max`
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: HashMap::new(),
        }
    }

    /// Delay before the next retry of `key`, advancing its sequence
    ///
    /// # Example
    ///
    /// ```
    /// use repository_controller::controller::backoff::ExponentialBackoff;
    /// use std::time::Duration;
    ///
    /// let mut backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(3));
    /// assert_eq!(backoff.when("a"), Duration::from_secs(1));
    /// assert_eq!(backoff.when("a"), Duration::from_secs(2));
    /// assert_eq!(backoff.when("a"), Duration::from_secs(3)); // capped
    /// assert_eq!(backoff.when("b"), Duration::from_secs(1)); // keys are independent
    /// ```
    pub fn when(&mut self, key: &str) -> Duration {
        let failures = self.failures.entry(key.to_string()).or_insert(0);
        let exponent = *failures;
        *failures = failures.saturating_add(1);

        2u32.checked_pow(exponent)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }

    /// Number of retries recorded for `key` since it was last forgotten
    #[must_use]
    pub fn num_requeues(&self, key: &str) -> u32 {
        self.failures.get(key).copied().unwrap_or(0)
    }

    /// Reset the sequence of `key`
    pub fn forget(&mut self, key: &str) {
        self.failures.remove(key);
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        use crate::constants::{DEFAULT_RATE_LIMIT_BASE_DELAY_MS, DEFAULT_RATE_LIMIT_MAX_DELAY_SECS};
        Self::new(
            Duration::from_millis(DEFAULT_RATE_LIMIT_BASE_DELAY_MS),
            Duration::from_secs(DEFAULT_RATE_LIMIT_MAX_DELAY_SECS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_sequence() {
        let mut backoff = ExponentialBackoff::default();
        let delays: Vec<Duration> = (0..5).map(|_| backoff.when("ns/repo")).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(5),
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(40),
                Duration::from_millis(80),
            ]
        );
    }

    #[test]
    fn test_exponential_backoff_caps_at_max() {
        let mut backoff = ExponentialBackoff::default();
        // 5ms * 2^18 is past 1000s
        for _ in 0..18 {
            backoff.when("ns/repo");
        }
        assert_eq!(backoff.when("ns/repo"), Duration::from_secs(1000));
    }

    #[test]
    fn test_exponential_backoff_survives_overflow() {
        let mut backoff = ExponentialBackoff::default();
        for _ in 0..100 {
            backoff.when("ns/repo");
        }
        assert_eq!(backoff.when("ns/repo"), Duration::from_secs(1000));
        assert_eq!(backoff.num_requeues("ns/repo"), 101);
    }

    #[test]
    fn test_exponential_backoff_forget() {
        let mut backoff = ExponentialBackoff::default();
        backoff.when("ns/repo");
        backoff.when("ns/repo");
        assert_eq!(backoff.num_requeues("ns/repo"), 2);

        backoff.forget("ns/repo");
        assert_eq!(backoff.num_requeues("ns/repo"), 0);
        assert_eq!(backoff.when("ns/repo"), Duration::from_millis(5));
    }

    #[test]
    fn test_exponential_backoff_unknown_key() {
        let backoff = ExponentialBackoff::default();
        assert_eq!(backoff.num_requeues("missing"), 0);
    }
}
