//! Bounded retry with exponential backoff for cache fetches.

use agrisense_core::RemoteError;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// How many times a failing fetch is attempted, and how long to wait between
/// attempts.
///
/// Only [`RemoteError::is_retryable`] failures are retried. Once attempts
/// are exhausted the entry settles as errored and stays that way until the
/// next read asks again.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first. `1` disables retrying.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    /// Upper bound of the random delay added to each backoff.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Whether a failure on the given 1-based attempt should be retried.
    pub fn should_retry(&self, attempt: u32, error: &RemoteError) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }

    /// Backoff before the attempt following `attempt`, without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30) as i32;
        let millis = self.initial_backoff.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Backoff before the attempt following `attempt`, with jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        base.saturating_add(jitter(self.jitter))
    }
}

fn jitter(bound: Duration) -> Duration {
    let bound_ms = bound.as_millis() as u64;
    if bound_ms == 0 {
        return Duration::ZERO;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_nanos(0))
        .subsec_nanos() as u64;
    Duration::from_millis(nanos % bound_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_policy_retries_transport_failures() {
        let policy = RetryPolicy::default();
        let err = RemoteError::transport("connection refused");
        assert!(policy.should_retry(1, &err));
        assert!(policy.should_retry(2, &err));
        assert!(!policy.should_retry(3, &err));
    }

    #[test]
    fn test_client_errors_are_not_retried() {
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry(1, &RemoteError::status(404, "Not found")));
        assert!(!policy.should_retry(1, &RemoteError::status(401, "Unauthorized")));
    }

    #[test]
    fn test_none_never_retries() {
        let policy = RetryPolicy::none();
        assert!(!policy.should_retry(1, &RemoteError::transport("reset")));
    }

    #[test]
    fn test_backoff_grows_then_caps() {
        let policy = RetryPolicy::default()
            .with_backoff(Duration::from_millis(100), Duration::from_millis(350))
            .with_multiplier(2.0);
        assert_eq!(policy.base_delay(1), Duration::from_millis(100));
        assert_eq!(policy.base_delay(2), Duration::from_millis(200));
        assert_eq!(policy.base_delay(3), Duration::from_millis(350));
        assert_eq!(policy.base_delay(10), Duration::from_millis(350));
    }

    proptest! {
        #[test]
        fn jittered_delay_stays_in_bounds(attempt in 1u32..20, jitter_ms in 0u64..500) {
            let policy = RetryPolicy::default().with_jitter(Duration::from_millis(jitter_ms));
            let base = policy.base_delay(attempt);
            let delay = policy.delay(attempt);
            prop_assert!(delay >= base);
            prop_assert!(delay <= base + Duration::from_millis(jitter_ms));
        }
    }
}
