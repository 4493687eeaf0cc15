//! Bounded exponential backoff for model calls.
//!
//! Quota errors (HTTP 429, `RESOURCE_EXHAUSTED`) are the normal state of a
//! long translation run on a free or low tier. They clear on their own, so
//! the policy waits `base * 2^(n-1)` (capped at `max_delay`) and tries again.
//! Every other failure kind is returned on the first attempt: retrying a
//! malformed request only burns quota.

use crate::error::ModelError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Retry settings for one kind of model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(4), Duration::from_secs(60))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` (1-based) just failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `call` under this policy.
    ///
    /// A blank `prompt` fails immediately with [`ModelError::InvalidInput`]:
    /// no attempt is made and no time is spent waiting. When every attempt
    /// hits a quota error, the last quota error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, label: &str, prompt: &str, mut call: F) -> Result<T, ModelError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ModelError>>,
    {
        if prompt.trim().is_empty() {
            return Err(ModelError::InvalidInput(
                "The prompt sent to the model is empty.".into(),
            ));
        }

        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "{}: attempt {}/{} failed: {}; retrying in {}ms",
                        label,
                        attempt,
                        self.max_attempts,
                        e,
                        delay.as_millis()
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(100), Duration::from_millis(1_000))
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = RetryPolicy::new(6, Duration::from_secs(4), Duration::from_secs(20));
        assert_eq!(p.backoff(1), Duration::from_secs(4));
        assert_eq!(p.backoff(2), Duration::from_secs(8));
        assert_eq!(p.backoff(3), Duration::from_secs(16));
        assert_eq!(p.backoff(4), Duration::from_secs(20));
        assert_eq!(p.backoff(40), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn quota_twice_then_success() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let out = policy()
            .run("page 1", "translate me", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(ModelError::TransientQuota("429".into()))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(out, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 100ms + 200ms of backoff
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn quota_on_every_attempt_is_reraised() {
        let calls = AtomicU32::new(0);
        let out: Result<(), _> = policy()
            .run("page 1", "translate me", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(ModelError::TransientQuota(format!("429 #{n}"))) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(out, Err(ModelError::TransientQuota("429 #2".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_prompt_fails_without_calling() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let out: Result<(), _> = policy()
            .run("page 1", " \n\t", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert!(matches!(out, Err(ModelError::InvalidInput(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn non_quota_errors_are_not_retried() {
        for err in [
            ModelError::InvalidInput("bad".into()),
            ModelError::DeadlineExceeded("slow".into()),
            ModelError::Generic("boom".into()),
        ] {
            let calls = AtomicU32::new(0);
            let expected = err.clone();
            let out: Result<(), _> = policy()
                .run("page 1", "translate me", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let e = err.clone();
                    async move { Err(e) }
                })
                .await;
            assert_eq!(out, Err(expected));
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }
}
