//! # Bounded Retry
//!
//! Per-call deadlines and exponential backoff for collaborator calls.
//!
//! Every attempt runs under `call_timeout_ms`; an expired deadline counts as a
//! retryable [`ScholarError::Timeout`]. Only errors for which
//! [`ScholarError::is_retryable`] holds are retried.

use crate::primitives::{
    DEFAULT_BASE_DELAY_MS, DEFAULT_CALL_TIMEOUT_MS, DEFAULT_MAX_ATTEMPTS, MAX_BACKOFF_MS,
};
use crate::types::ScholarError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Attempt budget, backoff and deadline for one kind of collaborator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts including the first; at least 1.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub call_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: MAX_BACKOFF_MS,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no sleeping. Used by tests and one-shot commands.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
        }
    }

    /// Backoff after the `failed`-th failed attempt (1-based):
    /// `base * 2^(failed - 1)`, capped at `max_delay_ms`.
    #[must_use]
    pub fn delay_after(&self, failed: u32) -> Duration {
        let exp = failed.saturating_sub(1).min(31);
        let ms = self
            .base_delay_ms
            .saturating_mul(2_u64.saturating_pow(exp))
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    pub fn validate(&self) -> Result<(), ScholarError> {
        if self.max_attempts == 0 {
            return Err(ScholarError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.call_timeout_ms == 0 {
            return Err(ScholarError::Config(
                "retry.call_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// The last error of a call that did not succeed, with the attempts spent.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryError {
    pub attempts: u32,
    pub last: ScholarError,
}

/// Await `fut` for at most `timeout_ms`, mapping expiry to [`ScholarError::Timeout`].
pub async fn with_deadline<T, Fut>(timeout_ms: u64, fut: Fut) -> Result<T, ScholarError>
where
    Fut: Future<Output = Result<T, ScholarError>>,
{
    match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
        Ok(result) => result,
        Err(_) => Err(ScholarError::Timeout(timeout_ms)),
    }
}

/// Run `op` under `policy`, retrying retryable failures with backoff.
///
/// `what` names the call in log lines.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScholarError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let outcome = with_deadline(policy.call_timeout_ms, op()).await;

        match outcome {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    call = what,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "call failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                return Err(RetryError {
                    attempts: attempt,
                    last: err,
                });
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts: attempts,
            base_delay_ms: 1,
            max_delay_ms: 4,
            call_timeout_ms: 1_000,
        }
    }

    #[test]
    fn delay_doubles_and_caps() {
        let p = RetryPolicy {
            max_attempts: 5,
            base_delay_ms: 100,
            max_delay_ms: 350,
            call_timeout_ms: 1,
        };
        assert_eq!(p.delay_after(1), Duration::from_millis(100));
        assert_eq!(p.delay_after(2), Duration::from_millis(200));
        assert_eq!(p.delay_after(3), Duration::from_millis(350));
        assert_eq!(p.delay_after(60), Duration::from_millis(350));
    }

    #[test]
    fn zero_attempts_rejected() {
        let p = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert!(p.validate().is_err());
        assert!(RetryPolicy::default().validate().is_ok());
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = with_retry(&fast(3), "flaky", || {
            let c = c.clone();
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(ScholarError::SourceUnavailable("503".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.expect("third attempt succeeds"), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_reports_attempts() {
        let err = with_retry(&fast(2), "down", || async {
            Err::<(), _>(ScholarError::Storage("locked".into()))
        })
        .await
        .unwrap_err();
        assert_eq!(err.attempts, 2);
        assert_eq!(err.last, ScholarError::Storage("locked".into()));
    }

    #[tokio::test]
    async fn non_retryable_fails_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let err = with_retry(&fast(5), "bad", || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ScholarError::ConstraintViolation("kind".into()))
            }
        })
        .await
        .unwrap_err();
        assert_eq!(err.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_call_times_out() {
        let policy = RetryPolicy {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
            call_timeout_ms: 10,
        };
        let err = with_retry(&policy, "slow", || async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok::<_, ScholarError>(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.last, ScholarError::Timeout(10));
    }
}
