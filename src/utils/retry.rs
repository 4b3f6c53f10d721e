//! Bounded exponential backoff for provider calls.

use std::future::Future;
use std::time::Duration;

/// Retry settings for network operations with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first try.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles afterwards.
    pub base_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Outcome of a retried operation together with how many attempts it took.
#[derive(Debug)]
pub struct Retried<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Retry an async operation while `should_retry` accepts the error.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    mut action: F,
    mut should_retry: R,
) -> Retried<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: FnMut(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match action(attempt).await {
            Ok(value) => {
                return Retried {
                    result: Ok(value),
                    attempts: attempt,
                }
            }
            Err(err) => {
                if attempt >= max_attempts || !should_retry(&err) {
                    return Retried {
                        result: Err(err),
                        attempts: attempt,
                    };
                }
                let delay = policy.delay_for(attempt);
                tracing::debug!("Attempt {} failed, retrying in {:?}", attempt, delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
