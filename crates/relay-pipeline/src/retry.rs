//! Bounded retry with exponential backoff for external calls.
//!
//! Applied only at the pipeline boundary (on-chain reads, name lookups);
//! never inside the codec or the index.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Retry policy for one external call site.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Minimum 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles per attempt after that.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting. Used in tests and for callers that
    /// handle failure themselves.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Run `operation` until it succeeds or attempts are exhausted,
    /// returning the last error.
    pub async fn run<T, E, F, Fut>(&self, what: &'static str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if last_attempt >= attempts => return Err(e),
                Err(e) => {
                    let delay = self.base_delay * 2u32.saturating_pow(last_attempt - 1);
                    warn!(
                        call = what,
                        attempt = last_attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "External call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    last_attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
        };
        let result: Result<u32, &str> = policy
            .run("flaky", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("transient")
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_last_error_when_exhausted() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(10),
        };
        let result: Result<(), String> = policy
            .run("always-down", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("attempt {n}")) }
            })
            .await;
        assert_eq!(result, Err("attempt 1".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_none_policy_is_single_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = RetryPolicy::none()
            .run("once", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("down") }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
