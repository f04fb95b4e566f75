//! Exponential backoff around a single logical fetch
//!
//! A logical fetch is attempted up to `max_attempts` times. After failed
//! attempt `i` (1-based) the loop sleeps `initial_delay * multiplier^(i-1)`,
//! capped at `max_delay`, and never sleeps after the final attempt.

use crate::config::RetryConfig;
use crate::domain::SourceError;
use std::future::Future;
use std::time::Duration;

/// Retry budget and delay schedule
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts including the first one
    pub max_attempts: usize,
    /// Delay after the first failed attempt
    pub initial_delay: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after_attempt(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as usize) as i32;
        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            multiplier: config.backoff_multiplier,
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Runs `operation` until it succeeds or the attempt budget is spent
///
/// # Errors
///
/// Returns `SourceError::RetriesExhausted` carrying the last attempt's cause
/// when every attempt failed.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    url: &str,
    mut operation: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt >= max_attempts {
                    tracing::error!(
                        url = %url,
                        attempts = attempt,
                        error = %e,
                        "Fetch failed after all attempts"
                    );
                    return Err(SourceError::RetriesExhausted {
                        url: url.to_string(),
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }

                let delay = policy.delay_after_attempt(attempt);
                crate::log_retry_attempt!(url, attempt, max_attempts, delay, e);

                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            multiplier: 2.0,
            max_delay: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_default_schedule_is_two_then_four_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_after_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after_attempt(2), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_millis(2000),
            multiplier: 2.0,
            max_delay: Duration::from_millis(5000),
        };
        assert_eq!(policy.delay_after_attempt(3), Duration::from_millis(5000));
        assert_eq!(policy.delay_after_attempt(60), Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let calls = AtomicUsize::new(0);
        let result = retry_with_backoff(&fast_policy(3), "http://test/ok", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, SourceError>(42)
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let result = retry_with_backoff(&fast_policy(3), "http://test/flaky", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(SourceError::Timeout("slow".to_string()))
            } else {
                Ok("body")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "body");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_cause() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> =
            retry_with_backoff(&fast_policy(3), "http://test/down", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SourceError::Status {
                    status: 500,
                    url: "http://test/down".to_string(),
                })
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result.unwrap_err() {
            SourceError::RetriesExhausted {
                url,
                attempts,
                last,
            } => {
                assert_eq!(url, "http://test/down");
                assert_eq!(attempts, 3);
                assert!(matches!(*last, SourceError::Status { status: 500, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let calls = AtomicUsize::new(0);
        let _ = retry_with_backoff(&fast_policy(0), "http://test/zero", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(SourceError::ConnectionFailed("refused".to_string()))
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
