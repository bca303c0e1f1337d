//! Retry logic for rate-limited requests
//!
//! Only rate-limit responses (HTTP 429) are retried. The delay before retry
//! `n` (zero-based) is `max(base_delay * 2^n, retry-after)`, up to
//! `max_retries` retries. Every attempt takes its own [`ThrottleGate`]
//! permit and gives it back before any backoff sleep, so a request that is
//! waiting out a rate limit never occupies a slot. A closed gate ends the
//! loop with an error before the operation runs.
//!
//! # Example
//!
//! ```no_run
//! use asana_export::config::RetryConfig;
//! use asana_export::retry::{IsRetryable, RetryPolicy};
//! use asana_export::throttle::{GateClosed, ThrottleGate};
//!
//! #[derive(Debug)]
//! enum MyError {
//!     TooManyRequests,
//!     Other,
//! }
//!
//! impl From<GateClosed> for MyError {
//!     fn from(_: GateClosed) -> Self {
//!         MyError::Other
//!     }
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::TooManyRequests)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let policy = RetryPolicy::new(RetryConfig::default(), ThrottleGate::new(3));
//! let value = policy.execute(|| async { Ok::<_, MyError>(42) }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::ApiError;
use crate::throttle::{GateClosed, ThrottleGate};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Only rate-limit responses should return `true`. Network failures and
/// other HTTP statuses are surfaced immediately.
pub trait IsRetryable: Sized {
    /// Returns true if the request was rejected by the rate limiter
    fn is_retryable(&self) -> bool;

    /// The server-suggested wait before retrying, if any
    fn retry_after(&self) -> Option<Duration> {
        None
    }

    /// Convert the final retryable error once the retry budget is spent
    fn into_exhausted(self, _attempts: u32) -> Self {
        self
    }
}

impl IsRetryable for ApiError {
    fn is_retryable(&self) -> bool {
        matches!(self, ApiError::RateLimited { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimited { rate_limit, .. } => rate_limit.retry_after_duration(),
            _ => None,
        }
    }

    fn into_exhausted(self, attempts: u32) -> Self {
        match self {
            ApiError::RateLimited { path, rate_limit } => ApiError::RetriesExhausted {
                path,
                attempts,
                rate_limit,
            },
            other => other,
        }
    }
}

/// Rate-limit retry policy bound to a throttle gate
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    config: RetryConfig,
    gate: ThrottleGate,
}

impl RetryPolicy {
    /// Create a policy whose attempts are admitted through `gate`
    pub fn new(config: RetryConfig, gate: ThrottleGate) -> Self {
        Self { config, gate }
    }

    /// The throttle gate every attempt goes through
    pub fn gate(&self) -> &ThrottleGate {
        &self.gate
    }

    /// The retry configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay before retry number `retry_count` (zero-based)
    ///
    /// `max(base_delay * 2^retry_count, retry_after)`. `max_delay` caps only
    /// the exponential part; the server's `retry-after` is always honored.
    pub fn backoff_delay(&self, retry_count: u32, retry_after: Option<Duration>) -> Duration {
        let factor = 2u32.saturating_pow(retry_count);
        let mut delay = self.config.base_delay.saturating_mul(factor);
        if let Some(max_delay) = self.config.max_delay {
            delay = delay.min(max_delay);
        }
        if self.config.jitter {
            delay = add_jitter(delay);
        }
        match retry_after {
            Some(retry_after) => delay.max(retry_after),
            None => delay,
        }
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or exhausts the retry budget
    ///
    /// `operation` must perform exactly one network call per invocation. It is
    /// invoked at most `max_retries + 1` times, and never once the gate is
    /// closed.
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: IsRetryable + From<GateClosed> + std::fmt::Display,
    {
        let mut retry_count: u32 = 0;

        loop {
            let permit = self.gate.acquire().await?;
            let outcome = operation().await;
            self.gate.release(permit);

            match outcome {
                Ok(result) => {
                    if retry_count > 0 {
                        tracing::info!(attempts = retry_count + 1, "Request succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(e) if e.is_retryable() && retry_count < self.config.max_retries => {
                    let delay = self.backoff_delay(retry_count, e.retry_after());
                    retry_count += 1;

                    tracing::warn!(
                        error = %e,
                        attempt = retry_count,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, backing off before retry"
                    );

                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    let attempts = retry_count + 1;
                    tracing::error!(
                        error = %e,
                        attempts,
                        "Rate limit persisted after all retries"
                    );
                    return Err(e.into_exhausted(attempts));
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Request failed with non-retryable error");
                    return Err(e);
                }
            }
        }
    }
}

/// Add random jitter to a delay
///
/// The result is uniformly distributed between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::rate_limit::RateLimitState;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[derive(Debug)]
    enum TestError {
        RateLimited(Option<Duration>),
        Exhausted(u32),
        Permanent,
        Closed,
    }

    impl From<GateClosed> for TestError {
        fn from(_: GateClosed) -> Self {
            TestError::Closed
        }
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::RateLimited(_) => write!(f, "rate limited"),
                TestError::Exhausted(n) => write!(f, "rate limited after {n} attempts"),
                TestError::Permanent => write!(f, "permanent error"),
                TestError::Closed => write!(f, "gate closed"),
            }
        }
    }

    impl IsRetryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, TestError::RateLimited(_))
        }

        fn retry_after(&self) -> Option<Duration> {
            match self {
                TestError::RateLimited(after) => *after,
                _ => None,
            }
        }

        fn into_exhausted(self, attempts: u32) -> Self {
            TestError::Exhausted(attempts)
        }
    }

    fn policy(config: RetryConfig) -> RetryPolicy {
        RetryPolicy::new(config, ThrottleGate::new(3))
    }

    #[tokio::test(start_paused = true)]
    async fn success_needs_no_retry() {
        let policy = policy(RetryConfig::default());
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = policy
            .execute(|| {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, TestError>(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1, "should only call once");
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_header_sets_the_single_backoff() {
        let policy = policy(RetryConfig::default());
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let start = Instant::now();

        let result = policy
            .execute(|| {
                let counter = counter_clone.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(TestError::RateLimited(Some(Duration::from_secs(5))))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        // base delay (2s) loses to retry-after (5s)
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5), "waited {elapsed:?}");
        assert!(elapsed < Duration::from_secs(6), "waited {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_rate_limit_fails_after_max_retries_plus_one_attempts() {
        let policy = policy(RetryConfig::default());
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let start = Instant::now();

        let result = policy
            .execute(|| {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>(TestError::RateLimited(None))
                }
            })
            .await;

        assert!(matches!(result, Err(TestError::Exhausted(6))));
        assert_eq!(counter.load(Ordering::SeqCst), 6);
        // 2 + 4 + 8 + 16 + 32 seconds of backoff
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(62), "waited {elapsed:?}");
        assert!(elapsed < Duration::from_secs(63), "waited {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error_is_not_retried() {
        let policy = policy(RetryConfig::default());
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let start = Instant::now();

        let result = policy
            .execute(|| {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>(TestError::Permanent)
                }
            })
            .await;

        assert!(matches!(result, Err(TestError::Permanent)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_max_retries_fails_on_first_rate_limit() {
        let policy = policy(RetryConfig {
            max_retries: 0,
            ..RetryConfig::default()
        });
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = policy
            .execute(|| {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>(TestError::RateLimited(None))
                }
            })
            .await;

        assert!(matches!(result, Err(TestError::Exhausted(1))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn permit_is_released_while_backing_off() {
        let gate = ThrottleGate::new(1);
        let policy = RetryPolicy::new(RetryConfig::default(), gate.clone());
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let task = tokio::spawn(async move {
            policy
                .execute(|| {
                    let counter = counter_clone.clone();
                    async move {
                        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                            Err(TestError::RateLimited(None))
                        } else {
                            Ok(())
                        }
                    }
                })
                .await
        });

        // Midway through the 2s backoff the only slot must be free
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(gate.in_flight(), 0);
        let permit = gate.acquire().await.unwrap();
        gate.release(permit);

        task.await.unwrap().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn every_attempt_runs_holding_a_permit() {
        let gate = ThrottleGate::new(3);
        let policy = RetryPolicy::new(RetryConfig::default(), gate.clone());
        let observed = Arc::new(std::sync::Mutex::new(Vec::new()));
        let counter = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute(|| {
                let gate = gate.clone();
                let observed = Arc::clone(&observed);
                let counter = Arc::clone(&counter);
                async move {
                    observed.lock().unwrap().push(gate.in_flight());
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TestError::RateLimited(None))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        result.unwrap();
        assert_eq!(*observed.lock().unwrap(), vec![1, 1, 1]);
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn closed_gate_fails_without_running_the_operation() {
        let gate = ThrottleGate::new(3);
        let policy = RetryPolicy::new(RetryConfig::default(), gate.clone());
        let counter = Arc::new(AtomicU32::new(0));
        gate.close();

        let counter_clone = Arc::clone(&counter);
        let result = policy
            .execute(|| {
                let counter = Arc::clone(&counter_clone);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, TestError>(())
                }
            })
            .await;

        assert!(matches!(result, Err(TestError::Closed)));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn backoff_doubles_from_base_delay() {
        let policy = policy(RetryConfig::default());

        assert_eq!(policy.backoff_delay(0, None), Duration::from_millis(2000));
        assert_eq!(policy.backoff_delay(1, None), Duration::from_millis(4000));
        assert_eq!(policy.backoff_delay(4, None), Duration::from_millis(32_000));
    }

    #[test]
    fn backoff_takes_the_larger_of_exponential_and_retry_after() {
        let policy = policy(RetryConfig::default());

        assert_eq!(
            policy.backoff_delay(0, Some(Duration::from_secs(5))),
            Duration::from_secs(5)
        );
        assert_eq!(
            policy.backoff_delay(3, Some(Duration::from_secs(5))),
            Duration::from_secs(16)
        );
    }

    #[test]
    fn max_delay_caps_exponential_part_but_not_retry_after() {
        let policy = policy(RetryConfig {
            max_delay: Some(Duration::from_secs(3)),
            ..RetryConfig::default()
        });

        assert_eq!(policy.backoff_delay(4, None), Duration::from_secs(3));
        assert_eq!(
            policy.backoff_delay(4, Some(Duration::from_secs(10))),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let delay = Duration::from_millis(50);
        for i in 0..200 {
            let jittered = add_jitter(delay);
            assert!(
                jittered >= delay && jittered <= delay * 2,
                "iteration {i}: jittered {jittered:?} outside [{delay:?}, {:?}]",
                delay * 2
            );
        }
    }

    #[test]
    fn only_rate_limited_api_errors_are_retryable() {
        let limited = ApiError::RateLimited {
            path: "/workspaces".to_string(),
            rate_limit: RateLimitState {
                retry_after: 5,
                ..RateLimitState::default()
            },
        };
        assert!(limited.is_retryable());
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(5)));

        let server_error = ApiError::Status {
            path: "/workspaces".to_string(),
            status: 503,
            body: String::new(),
        };
        assert!(!server_error.is_retryable());
        assert_eq!(server_error.retry_after(), None);
    }

    #[test]
    fn exhausted_rate_limit_becomes_retries_exhausted() {
        let limited = ApiError::RateLimited {
            path: "/users/me".to_string(),
            rate_limit: RateLimitState::default(),
        };

        match limited.into_exhausted(6) {
            ApiError::RetriesExhausted { path, attempts, .. } => {
                assert_eq!(path, "/users/me");
                assert_eq!(attempts, 6);
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }
}
