//! Backoff policy for transient delivery failures.

use std::{future::Future, time::Duration};

use tokio::time::sleep;

use crate::error::{Error, NotifierResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Never below 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before the attempt following failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// How long to wait after `error`, or `None` when it should not be retried.
    pub fn next_delay(&self, attempt: u32, error: &Error) -> Option<Duration> {
        if attempt >= self.max_attempts || !error.is_retryable() {
            return None;
        }
        match error {
            // Slack's own hint wins over the local schedule.
            Error::RatelimitExceeded(Some(retry_after)) => Some(*retry_after),
            _ => Some(self.delay_for(attempt)),
        }
    }

    /// Runs `operation` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> NotifierResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = NotifierResult<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(report) => match self.next_delay(attempt, report.current_context()) {
                    Some(delay) => {
                        tracing::warn!(
                            operation = label,
                            attempt,
                            max_attempts = self.max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            "Slack delivery failed, retrying: {}",
                            report.current_context()
                        );
                        sleep(delay).await;
                    }
                    None => {
                        if report.current_context().is_retryable() {
                            tracing::error!(
                                operation = label,
                                attempt,
                                "Slack delivery failed after {attempt} attempts, giving up"
                            );
                        }
                        return Err(report.attach_printable(format!(
                            "{label} failed after {attempt} attempt(s)"
                        )));
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use error_stack::report;
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1), Duration::from_millis(5))
    }

    #[test]
    fn test_delay_for_is_exponential_and_capped() {
        let policy = RetryPolicy::new(10, Duration::from_secs(1), Duration::from_secs(30));
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(5), Duration::from_secs(16));
        assert_eq!(policy.delay_for(6), Duration::from_secs(30));
        assert_eq!(policy.delay_for(100), Duration::from_secs(30));
    }

    #[test]
    fn test_next_delay_respects_retry_after() {
        let policy = RetryPolicy::default();
        let err = Error::RatelimitExceeded(Some(Duration::from_secs(9)));
        assert_eq!(policy.next_delay(1, &err), Some(Duration::from_secs(9)));
        let err = Error::RatelimitExceeded(None);
        assert_eq!(policy.next_delay(2, &err), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_next_delay_stops_on_permanent_errors_and_last_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.next_delay(1, &Error::SlackApiError("invalid_auth".into())),
            None
        );
        assert_eq!(
            policy.next_delay(5, &Error::ServerError("503".into())),
            None
        );
    }

    #[test]
    fn test_new_clamps_attempts() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_run_retries_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = fast_policy(5)
            .run("test", || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(report!(Error::ServerError("boom".into())))
                    } else {
                        Ok("sent")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "sent");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: NotifierResult<()> = fast_policy(3)
            .run("test", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(report!(Error::TransportError("refused".into())))
                }
            })
            .await;
        assert!(matches!(
            result.unwrap_err().current_context(),
            Error::TransportError(_)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_permanent_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: NotifierResult<()> = fast_policy(5)
            .run("test", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(report!(Error::ReqwestError("403".into())))
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
