//! Retry logic with exponential backoff for API requests

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::BlogError;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each retry after that
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryConfig {
    /// Delay to wait after the given failed attempt (counted from 1).
    ///
    /// `base_delay * 2^(attempt - 1)`, saturating instead of overflowing.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis();
        let shift = attempt.saturating_sub(1).min(63);
        let multiplier = 1u128.checked_shl(shift).unwrap_or(u128::MAX);
        let delay_ms = base_ms.saturating_mul(multiplier);
        Duration::from_millis(delay_ms.min(u64::MAX as u128) as u64)
    }
}

/// Failure classification the executor needs.
pub trait Retryable {
    /// Transient failure that may succeed on a later attempt.
    fn is_retryable(&self) -> bool;
    /// Permanent client error; never retried, whatever the budget.
    fn is_client_error(&self) -> bool;
}

impl Retryable for BlogError {
    fn is_retryable(&self) -> bool {
        BlogError::is_retryable(self)
    }

    fn is_client_error(&self) -> bool {
        BlogError::is_client_error(self)
    }
}

/// Retry a fallible async operation with exponential backoff.
///
/// The operation is attempted up to `config.max_attempts` times. A failure is
/// retried only while it is retryable and not a client error; otherwise, or
/// once the attempts run out, the last error is returned unchanged.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                if err.is_client_error() || !err.is_retryable() {
                    debug!(operation = operation_name, attempt, error = %err, "not retrying");
                    return Err(err);
                }

                if attempt >= max_attempts {
                    warn!(
                        "{} failed after {} attempts: {}",
                        operation_name, attempt, err
                    );
                    return Err(err);
                }

                let delay = config.delay_after(attempt);
                warn!(
                    "{} attempt {}/{} failed: {}. Retrying in {:?}...",
                    operation_name, attempt, max_attempts, err, delay
                );

                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify_response;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn delays_double_from_base() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_after(1), Duration::from_millis(1000));
        assert_eq!(config.delay_after(2), Duration::from_millis(2000));
        assert_eq!(config.delay_after(3), Duration::from_millis(4000));
        assert!(config.delay_after(200) > Duration::from_secs(1_000_000));
    }

    #[tokio::test(start_paused = true)]
    async fn server_errors_use_every_attempt() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::default();
        let started = Instant::now();

        let result: Result<(), BlogError> = retry_with_backoff(&config, "list_posts", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(classify_response(500, "")) }
        })
        .await;

        let err = result.expect_err("always fails");
        assert_eq!(err.status(), Some(500));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(3000), "waited {elapsed:?}");
        assert!(elapsed < Duration::from_millis(3100), "waited {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_attempted_once() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 10,
            ..Default::default()
        };

        let result: Result<(), BlogError> = retry_with_backoff(&config, "get_post", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(classify_response(404, r#"{"message":"Post not found"}"#)) }
        })
        .await;

        let err = result.expect_err("not found");
        assert_eq!(err.message(), "Post not found");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_is_retried() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::default();

        let result = retry_with_backoff(&config, "like_post", || {
            let current = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if current == 1 {
                    Err(classify_response(429, ""))
                } else {
                    Ok("liked")
                }
            }
        })
        .await;

        assert_eq!(result.expect("second attempt succeeds"), "liked");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn network_failure_recovers() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
        };

        let result = retry_with_backoff(&config, "create_post", || {
            let current = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if current < 3 {
                    Err(BlogError::Network {
                        message: "connection reset".into(),
                        source: None,
                    })
                } else {
                    Ok(current)
                }
            }
        })
        .await;

        assert_eq!(result.expect("third attempt succeeds"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 0,
            ..Default::default()
        };

        let _: Result<(), BlogError> = retry_with_backoff(&config, "delete_post", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(classify_response(503, "")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
