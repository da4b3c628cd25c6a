//! Retry policy for store calls.

use std::thread;
use std::time::Duration;

use pss_core::StoreError;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff.saturating_mul(1u32 << retry.min(16))
    }

    /// Run `op`, retrying timeouts and unavailability; other failures return at once.
    pub fn run<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut retry = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && retry < self.max_retries => {
                    let delay = self.delay_for(retry);
                    retry += 1;
                    warn!(
                        "{what} failed ({err}); retry {retry}/{} in {}ms",
                        self.max_retries,
                        delay.as_millis()
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pss_core::StoreErrorKind;

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff: Duration::ZERO,
        }
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
    }

    #[test]
    fn transient_failures_are_retried() {
        let mut calls = 0;
        let result = fast(3).run("upsert", || {
            calls += 1;
            if calls < 3 {
                Err(StoreError::new(StoreErrorKind::Unavailable, "503"))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let mut calls = 0;
        let err = fast(2)
            .run("upsert", || -> Result<(), _> {
                calls += 1;
                Err(StoreError::new(StoreErrorKind::Timeout, "slow"))
            })
            .unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::Timeout);
        assert_eq!(calls, 3);
    }

    #[test]
    fn permanent_failures_are_not_retried() {
        for kind in [
            StoreErrorKind::PermissionDenied,
            StoreErrorKind::Conflict,
            StoreErrorKind::NotFound,
            StoreErrorKind::Rejected,
            StoreErrorKind::Malformed,
        ] {
            let mut calls = 0;
            let _ = fast(3).run("patch", || -> Result<(), _> {
                calls += 1;
                Err(StoreError::new(kind, "no"))
            });
            assert_eq!(calls, 1, "{kind} must not be retried");
        }
    }
}
