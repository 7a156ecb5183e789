//! Bounded retries for model calls inside a stage budget.

use crate::config::RetrySettings;
use crate::llm_client::{LlmError, LlmErrorKind};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Exponential-backoff retry policy.
///
/// Only transient failures are retried, and never past the caller's deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_backoff: Duration,
}

impl RetryPolicy {
    /// Creates a policy with at least one attempt.
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    /// Total attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_backoff
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }

    /// Runs `op` until it succeeds, fails permanently, runs out of attempts,
    /// or the next backoff would cross `deadline`.
    ///
    /// Each attempt is itself cut off at the deadline and reported as
    /// [`LlmErrorKind::Timeout`].
    #[instrument(skip(self, op), fields(max_attempts = self.max_attempts))]
    pub async fn run<T, F, Fut>(&self, deadline: Instant, mut op: F) -> Result<T, LlmError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut attempt = 1;
        loop {
            let outcome = match tokio::time::timeout_at(deadline, op(attempt)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(LlmError::new(
                    LlmErrorKind::Timeout,
                    format!("Model call timeout on attempt {}", attempt),
                )),
            };

            let err = match outcome {
                Ok(value) => {
                    debug!(attempt, "Model call succeeded");
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_retryable() || attempt >= self.max_attempts {
                warn!(attempt, kind = %err.kind, "Giving up on model call");
                return Err(err);
            }

            let backoff = self.backoff(attempt);
            let fits = Instant::now()
                .checked_add(backoff)
                .is_some_and(|resume| resume < deadline);
            if !fits {
                warn!(attempt, ?backoff, "No time left for another attempt");
                return Err(err);
            }

            debug!(attempt, ?backoff, kind = %err.kind, "Retrying model call");
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetrySettings::default().into()
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        Self::new(
            *settings.max_attempts(),
            Duration::from_millis(*settings.base_backoff_ms()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> LlmError {
        LlmError::new(LlmErrorKind::Transport, "connection reset".to_string())
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let deadline = Instant::now() + Duration::from_secs(1);
        let counter = calls.clone();
        let result = policy
            .run(deadline, move |attempt| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { if attempt < 3 { Err(transient()) } else { Ok(attempt) } }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let deadline = Instant::now() + Duration::from_secs(1);
        let counter = calls.clone();
        let result: Result<(), _> = policy
            .run(deadline, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(LlmError::new(LlmErrorKind::Auth, "bad key".to_string())) }
            })
            .await;
        assert_eq!(result.unwrap_err().kind, LlmErrorKind::Auth);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stops_at_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let deadline = Instant::now() + Duration::from_secs(1);
        let counter = calls.clone();
        let result: Result<(), _> = policy
            .run(deadline, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_backoff_never_crosses_deadline() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(5, Duration::from_secs(10));
        let deadline = Instant::now() + Duration::from_millis(50);
        let counter = calls.clone();
        let result: Result<(), _> = policy
            .run(deadline, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_oversized_backoff_gives_up() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::MAX);
        let deadline = Instant::now() + Duration::from_secs(1);
        let counter = calls.clone();
        let result: Result<(), _> = policy
            .run(deadline, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            })
            .await;
        assert_eq!(result.unwrap_err().kind, LlmErrorKind::Transport);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_attempt_reports_timeout() {
        let policy = RetryPolicy::new(1, Duration::from_millis(1));
        let deadline = Instant::now() + Duration::from_millis(20);
        let result: Result<(), _> = policy
            .run(deadline, |_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert_eq!(result.unwrap_err().kind, LlmErrorKind::Timeout);
    }
}
