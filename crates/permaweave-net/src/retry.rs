//! Bounded retry with capped exponential backoff.
//!
//! Only transient gateway failures are retried; a rejection is final on
//! the first attempt. Batch callers get the attempt count back so they
//! can report how hard they tried.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::GatewayError;

/// Retry budget and backoff shape for gateway calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failure; doubles each retry.
    pub base_delay: Duration,
    /// Backoff cap.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt` (1-based: the delay after
    /// the first failure is `delay_for(1)`).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails non-transiently, or exhausts the
/// policy. Returns the attempt count alongside the final error.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, (u32, GatewayError)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(attempt, error = %e, ?delay, "transient gateway failure, backing off");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err((attempt, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for(9), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&RetryPolicy::default(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(GatewayError::Timeout)
                } else {
                    Ok(7u32)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_fails_fast() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(GatewayError::Rejected("bad anchor".into())) }
        })
        .await;
        let (attempts, error) = result.unwrap_err();
        assert_eq!(attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(error, GatewayError::Rejected(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_reports_attempts() {
        let result: Result<(), _> = with_retry(&RetryPolicy::default(), || async {
            Err(GatewayError::Unavailable("503".into()))
        })
        .await;
        let (attempts, error) = result.unwrap_err();
        assert_eq!(attempts, 3);
        assert!(error.is_transient());
    }
}
