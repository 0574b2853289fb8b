//! Exponential backoff for gateway timeouts.
//!
//! Overpass answers `504 Gateway Timeout` when it is overloaded, and such a
//! query often succeeds a few seconds later. Only that class of failure is
//! retried; anything else is returned to the caller on the first attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::UpstreamError;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1500);

/// Default multiplier applied to the delay after each retry.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

/// How often and how patiently to retry gateway timeouts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry. Always `>= 1.0`.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay before the first retry.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the backoff multiplier. Values below 1.0 or non-finite values
    /// are replaced with 1.0 (constant delay).
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = if factor.is_finite() && factor >= 1.0 {
            factor
        } else {
            1.0
        };
        self
    }

    /// Delay before retry number `retry` (1-based).
    ///
    /// With the default policy this is 1.5s for the first retry and 3.0s for
    /// the second.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Sum of all backoff delays if every retry is used.
    pub fn total_backoff(&self) -> Duration {
        (1..=self.max_retries)
            .map(|retry| self.delay_for(retry))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Run `attempt` until it succeeds, fails with a non-retryable error, or the
/// policy's retries are exhausted.
///
/// The closure receives the zero-based attempt number.
pub async fn retry_gateway_timeouts<T, F, Fut>(
    policy: &RetryPolicy,
    mut attempt: F,
) -> Result<T, UpstreamError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let mut retries = 0;
    loop {
        match attempt(retries).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_gateway_timeout() && retries < policy.max_retries => {
                retries += 1;
                let delay = policy.delay_for(retries);
                tracing::warn!(
                    attempt = retries,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Gateway timeout from Overpass, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::time::Instant;

    #[test]
    fn test_default_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(3000));
        assert_eq!(policy.total_backoff(), Duration::from_millis(4500));
    }

    #[test]
    fn test_backoff_factor_sanitized() {
        let policy = RetryPolicy::default().with_backoff_factor(0.5);
        assert_eq!(policy.backoff_factor, 1.0);
        let policy = RetryPolicy::default().with_backoff_factor(f64::NAN);
        assert_eq!(policy.backoff_factor, 1.0);
        let policy = RetryPolicy::default().with_backoff_factor(3.0);
        assert_eq!(policy.delay_for(2), Duration::from_millis(4500));
    }

    #[test]
    fn test_none_has_no_backoff() {
        assert_eq!(RetryPolicy::none().total_backoff(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_two_gateway_timeouts() {
        let calls = Cell::new(0u32);
        let start = Instant::now();

        let result = retry_gateway_timeouts(&RetryPolicy::default(), |_| {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n <= 2 {
                    Err(UpstreamError::Status { status: 504 })
                } else {
                    Ok("elements")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("elements"));
        assert_eq!(calls.get(), 3);
        assert!(start.elapsed() >= Duration::from_millis(4500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_timeout_is_retried() {
        let calls = Cell::new(0u32);

        let result = retry_gateway_timeouts(&RetryPolicy::default(), |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt == 0 {
                    Err(UpstreamError::Timeout)
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(1));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let calls = Cell::new(0u32);
        let start = Instant::now();

        let result: Result<(), _> = retry_gateway_timeouts(&RetryPolicy::default(), |_| {
            calls.set(calls.get() + 1);
            async { Err(UpstreamError::Timeout) }
        })
        .await;

        assert_eq!(result, Err(UpstreamError::Timeout));
        assert_eq!(calls.get(), 3);
        assert!(start.elapsed() >= Duration::from_millis(4500));
        assert!(start.elapsed() < Duration::from_millis(6000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_timeout_is_not_retried() {
        let calls = Cell::new(0u32);
        let start = Instant::now();

        let result: Result<(), _> = retry_gateway_timeouts(&RetryPolicy::default(), |_| {
            calls.set(calls.get() + 1);
            async { Err(UpstreamError::Status { status: 502 }) }
        })
        .await;

        assert_eq!(result, Err(UpstreamError::Status { status: 502 }));
        assert_eq!(calls.get(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_is_not_retried() {
        let calls = Cell::new(0u32);

        let result: Result<(), _> = retry_gateway_timeouts(&RetryPolicy::default(), |_| {
            calls.set(calls.get() + 1);
            async {
                Err(UpstreamError::Unreachable {
                    message: "connection refused".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(UpstreamError::Unreachable { .. })));
        assert_eq!(calls.get(), 1);
    }
}
