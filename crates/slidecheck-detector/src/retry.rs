//! Retry with exponential backoff as an explicit state machine
//!
//! ```text
//! Pending ──ok──────────────▶ Succeeded
//!    │ transient error
//!    ▼
//! Retrying(n) ──ok──────────▶ Succeeded
//!    │ transient, n == max ──▶ Exhausted
//!    │ fatal error (any state) ▶ Fatal
//! ```

use slidecheck_llm::LlmError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How often and how patiently to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Floor on the delay after the service reports a rate limit
    pub rate_limit_wait: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            rate_limit_wait: Duration::ZERO,
        }
    }

    /// Wait at least `wait` before retrying a rate-limited request
    pub fn with_rate_limit_wait(mut self, wait: Duration) -> Self {
        self.rate_limit_wait = wait;
        self
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`, capped
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Delay before retry number `retry` when the last attempt failed with `error`
    pub fn delay_after(&self, retry: u32, error: &LlmError) -> Duration {
        let backoff = self.backoff(retry);
        match error {
            LlmError::RateLimitExceeded => backoff.max(self.rate_limit_wait),
            _ => backoff,
        }
    }
}

/// Where a request stands between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Not attempted yet
    Pending,
    /// The nth retry is due
    Retrying(u32),
    /// An attempt succeeded
    Succeeded,
    /// Every allowed retry failed transiently
    Exhausted,
    /// A non-retryable error ended the request
    Fatal,
}

impl AttemptState {
    /// State after an attempt made in `self` ends with `result`
    pub fn next(self, policy: &RetryPolicy, result: Result<(), &LlmError>) -> AttemptState {
        let retries_used = match self {
            AttemptState::Pending => 0,
            AttemptState::Retrying(n) => n,
            terminal => return terminal,
        };
        match result {
            Ok(()) => AttemptState::Succeeded,
            Err(e) if !e.is_transient() => AttemptState::Fatal,
            Err(_) if retries_used >= policy.max_retries => AttemptState::Exhausted,
            Err(_) => AttemptState::Retrying(retries_used + 1),
        }
    }

    /// Whether no more attempts will be made
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptState::Succeeded | AttemptState::Exhausted | AttemptState::Fatal
        )
    }
}

/// Final result of a retried operation
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T> {
    /// The operation produced a value
    Succeeded {
        /// The value
        value: T,
        /// Attempts made, including the successful one
        attempts: u32,
    },
    /// Retries ran out on transient errors
    Exhausted {
        /// Last error seen
        error: LlmError,
        /// Attempts made
        attempts: u32,
    },
    /// A non-retryable error stopped the operation
    Fatal {
        /// The error
        error: LlmError,
        /// Attempts made
        attempts: u32,
    },
}

impl<T> RetryOutcome<T> {
    /// Attempts made
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. }
            | RetryOutcome::Exhausted { attempts, .. }
            | RetryOutcome::Fatal { attempts, .. } => *attempts,
        }
    }
}

/// Run `operation` until it succeeds, fails fatally or exhausts `policy`
///
/// `operation` receives the 1-based attempt number.
pub async fn run_with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut state = AttemptState::Pending;
    let mut attempts = 0;

    loop {
        attempts += 1;
        let result = operation(attempts).await;
        state = state.next(policy, result.as_ref().map(|_| ()));

        let error = match result {
            Ok(value) => return RetryOutcome::Succeeded { value, attempts },
            Err(error) => error,
        };

        if state.is_terminal() {
            if state == AttemptState::Fatal {
                return RetryOutcome::Fatal { error, attempts };
            }
            warn!(attempts, error = %error, "Retries exhausted");
            return RetryOutcome::Exhausted { error, attempts };
        }

        // After `attempts` failures the next attempt is retry number `attempts`
        let delay = policy.delay_after(attempts, &error);
        warn!(
            attempt = attempts,
            error = %error,
            delay_ms = delay.as_millis() as u64,
            "Transient failure, will retry"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(500));
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(500));
        assert_eq!(policy.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn test_state_transitions() {
        let policy = instant(2);
        let transient = LlmError::RateLimitExceeded;
        let fatal = LlmError::Authentication("bad key".into());

        let s = AttemptState::Pending.next(&policy, Err(&transient));
        assert_eq!(s, AttemptState::Retrying(1));
        let s = s.next(&policy, Err(&transient));
        assert_eq!(s, AttemptState::Retrying(2));
        assert_eq!(s.next(&policy, Err(&transient)), AttemptState::Exhausted);
        assert_eq!(s.next(&policy, Ok(())), AttemptState::Succeeded);
        assert_eq!(AttemptState::Pending.next(&policy, Err(&fatal)), AttemptState::Fatal);
        assert_eq!(
            AttemptState::Exhausted.next(&policy, Ok(())),
            AttemptState::Exhausted
        );
        assert!(AttemptState::Fatal.is_terminal());
        assert!(!AttemptState::Retrying(1).is_terminal());
    }

    #[tokio::test]
    async fn test_succeeds_after_k_transient_failures() {
        for k in 0..4u32 {
            let calls = AtomicU32::new(0);
            let outcome = run_with_retry(&instant(3), |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < k {
                        Err(LlmError::Timeout(60))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

            assert_eq!(
                outcome,
                RetryOutcome::Succeeded {
                    value: "done",
                    attempts: k + 1
                }
            );
        }
    }

    #[tokio::test]
    async fn test_exhausted_after_max_retries() {
        let outcome: RetryOutcome<()> = run_with_retry(&instant(2), |_| async {
            Err(LlmError::Server {
                status: 503,
                message: "unavailable".into(),
            })
        })
        .await;

        assert!(matches!(outcome, RetryOutcome::Exhausted { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_fatal_error_not_retried() {
        let outcome: RetryOutcome<()> = run_with_retry(&instant(5), |_| async {
            Err(LlmError::ModelNotAvailable("gemini-x".into()))
        })
        .await;

        assert!(matches!(outcome, RetryOutcome::Fatal { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn test_no_retries_policy() {
        let outcome: RetryOutcome<()> = run_with_retry(&RetryPolicy::none(), |_| async {
            Err(LlmError::RateLimitExceeded)
        })
        .await;
        assert_eq!(outcome.attempts(), 1);
    }

    #[test]
    fn test_rate_limit_wait_only_applies_to_rate_limits() {
        let policy = RetryPolicy::new(2, Duration::from_secs(1), Duration::from_secs(10))
            .with_rate_limit_wait(Duration::from_secs(60));

        assert_eq!(
            policy.delay_after(1, &LlmError::RateLimitExceeded),
            Duration::from_secs(60)
        );
        assert_eq!(
            policy.delay_after(2, &LlmError::Timeout(30)),
            Duration::from_secs(2)
        );
        assert_eq!(
            RetryPolicy::new(2, Duration::from_secs(1), Duration::from_secs(10))
                .delay_after(1, &LlmError::RateLimitExceeded),
            Duration::from_secs(1)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_attempt_waits_before_retry() {
        let policy = RetryPolicy::new(1, Duration::from_secs(1), Duration::from_secs(10))
            .with_rate_limit_wait(Duration::from_secs(60));
        let start = tokio::time::Instant::now();

        let outcome = run_with_retry(&policy, |attempt| async move {
            if attempt == 1 {
                Err(LlmError::RateLimitExceeded)
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(
            outcome,
            RetryOutcome::Succeeded {
                value: 2,
                attempts: 2
            }
        );
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_sleeps_between_attempts() {
        let policy = RetryPolicy::new(2, Duration::from_secs(1), Duration::from_secs(10));
        let start = tokio::time::Instant::now();
        let outcome: RetryOutcome<()> =
            run_with_retry(&policy, |_| async { Err(LlmError::RateLimitExceeded) }).await;

        assert_eq!(outcome.attempts(), 3);
        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}
