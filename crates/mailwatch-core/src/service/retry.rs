//! Bounded retry with exponential backoff for provider calls.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::error::MailServiceError;

/// How often, and how patiently, a provider call is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first (at least 1).
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before attempt `attempt + 1`, given the failure of `attempt`
    /// (1-based). A provider-supplied `Retry-After` wins, within the cap.
    #[must_use]
    pub fn backoff(&self, attempt: u32, error: &MailServiceError) -> Duration {
        if let MailServiceError::RateLimited {
            retry_after: Some(after),
        } = error
        {
            return (*after).min(self.max_backoff);
        }
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Runs `call` until it succeeds, fails with a terminal error, or the
    /// attempt budget is spent. The last error is returned.
    ///
    /// # Errors
    ///
    /// Returns the final [`MailServiceError`] from `call`.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, MailServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MailServiceError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.backoff(attempt, &e);
                    debug!(
                        "{operation} failed (attempt {attempt}/{max_attempts}): {e}; retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        warn!("{operation} failed after {attempt} attempts: {e}");
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 4,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(3),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let err = MailServiceError::Connection("reset".into());
        let policy = policy();
        assert_eq!(policy.backoff(1, &err), Duration::from_secs(1));
        assert_eq!(policy.backoff(2, &err), Duration::from_secs(2));
        assert_eq!(policy.backoff(3, &err), Duration::from_secs(3));
        assert_eq!(policy.backoff(40, &err), Duration::from_secs(3));
    }

    #[test]
    fn test_retry_after_is_honored_within_cap() {
        let policy = policy();
        let short = MailServiceError::RateLimited {
            retry_after: Some(Duration::from_millis(1500)),
        };
        let long = MailServiceError::RateLimited {
            retry_after: Some(Duration::from_secs(60)),
        };
        assert_eq!(policy.backoff(1, &short), Duration::from_millis(1500));
        assert_eq!(policy.backoff(1, &long), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<(), _> = policy()
            .run("list", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(MailServiceError::Server {
                    status: 503,
                    message: "unavailable".into(),
                })
            })
            .await;

        assert!(matches!(result, Err(MailServiceError::Server { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // 1s + 2s + 3s of backoff
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_error_is_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy()
            .run("get", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(MailServiceError::Authentication("401".into()))
            })
            .await;

        assert!(matches!(result, Err(MailServiceError::Authentication(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);

        let value = policy()
            .run("count", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(MailServiceError::Connection("reset".into()))
                } else {
                    Ok(42_u64)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_none_policy_makes_one_attempt() {
        let calls = AtomicU32::new(0);
        let _ = RetryPolicy::none()
            .run("list", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(MailServiceError::Connection("reset".into()))
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
