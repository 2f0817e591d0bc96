//! Caller-side retry policy.
//!
//! The generator and assembler never retry on their own; callers that want
//! resilience wrap a whole operation in a [`RetryPolicy`].

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::Result;

/// Exponential backoff with an attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that runs the operation exactly once.
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

    /// Delay before retry number `attempt` (1-based).
    ///
    /// A wait suggested by the service is used as is; retrying sooner would
    /// only hit the limit again. Computed backoff is capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        match hint {
            Some(wait) => wait,
            None => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                self.base_delay.saturating_mul(factor).min(self.max_delay)
            }
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts run out. The last error is returned.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt, err.retry_after());
                    warn!(
                        operation = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RadioError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_delay_for_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1, None), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2, None), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3, None), Duration::from_secs(4));
        assert_eq!(policy.delay_for(10, None), Duration::from_secs(30));
    }

    #[test]
    fn test_delay_for_hint() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for(1, Some(Duration::from_millis(7500))),
            Duration::from_millis(7500)
        );
        // "try again in 1m2s" is honoured past the backoff cap.
        assert_eq!(
            policy.delay_for(1, Some(Duration::from_secs(62))),
            Duration::from_secs(62)
        );
        assert_eq!(
            policy.delay_for(3, Some(Duration::from_millis(200))),
            Duration::from_millis(200)
        );
    }

    #[tokio::test]
    async fn test_run_retries_transport_then_succeeds() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = fast()
            .run("test", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(RadioError::Transport {
                        status: Some(503),
                        message: "busy".to_string(),
                    })
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = fast()
            .run("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(RadioError::RateLimited {
                    retry_after: Some(Duration::from_millis(1)),
                    message: "quota".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(RadioError::RateLimited { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_parse_errors() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = fast()
            .run("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(RadioError::Parse("no json".to_string()))
            })
            .await;

        assert!(matches!(result, Err(RadioError::Parse(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_none_runs_once() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let _: Result<()> = RetryPolicy::none()
            .run("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(RadioError::Transport {
                    status: None,
                    message: "down".to_string(),
                })
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
