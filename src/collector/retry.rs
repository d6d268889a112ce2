//! Bounded exponential backoff around a fallible async operation.
//!
//! The loop is driven by [`Attempt`], a small state machine that decides after each
//! failure whether to wait and try again or give up. Waiting goes through [`Sleeper`]
//! so tests can observe delays without real time passing.

use crate::error::AnalysisError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; the operation runs at most `max_retries + 1` times.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Upper bound of random delay added to each backoff. Zero disables jitter.
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.max_jitter.is_zero() {
            return delay;
        }
        let max = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        let extra = rand::rng().random_range(0..=max);
        delay + Duration::from_millis(extra)
    }
}

/// State of a retry loop: how many invocations have been made and the backoff owed
/// before the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub count: u32,
    pub next_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Retry { delay: Duration, next: Attempt },
    GiveUp,
}

impl Attempt {
    pub fn first(policy: &RetryPolicy) -> Self {
        Self {
            count: 1,
            next_delay: policy.base_delay,
        }
    }

    /// Delay before retry k is `base_delay * 2^(k-1)`.
    pub fn after_failure(self, policy: &RetryPolicy, error: &AnalysisError) -> Step {
        if !error.is_retryable() || self.count > policy.max_retries {
            return Step::GiveUp;
        }
        Step::Retry {
            delay: self.next_delay,
            next: Attempt {
                count: self.count + 1,
                next_delay: self.next_delay.saturating_mul(2),
            },
        }
    }
}

#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Runs `operation` until it succeeds, fails terminally, or the policy is exhausted.
/// The last error is returned as-is.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut operation: F,
) -> Result<T, AnalysisError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AnalysisError>>,
{
    let mut attempt = Attempt::first(policy);
    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        match attempt.after_failure(policy, &error) {
            Step::GiveUp => return Err(error),
            Step::Retry { delay, next } => {
                let delay = policy.jittered(delay);
                warn!(
                    "🔁 Attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt.count,
                    policy.max_retries + 1,
                    error,
                    delay
                );
                sleeper.sleep(delay).await;
                attempt = next;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::InfraError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Records requested delays instead of sleeping.
    #[derive(Default)]
    pub(crate) struct RecordingSleeper {
        pub(crate) delays: Mutex<Vec<Duration>>,
    }

    #[async_trait::async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    fn transient() -> AnalysisError {
        InfraError::Status { status: 503, body: "unavailable".into() }.into()
    }

    #[test]
    fn state_machine_doubles_delay_until_exhausted() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let err = transient();
        let mut attempt = Attempt::first(&policy);
        let mut delays = Vec::new();
        while let Step::Retry { delay, next } = attempt.after_failure(&policy, &err) {
            delays.push(delay.as_millis());
            attempt = next;
        }
        assert_eq!(delays, vec![100, 200, 400]);
        assert_eq!(attempt.count, 4);
    }

    #[test]
    fn terminal_error_gives_up_immediately() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let bad_request: AnalysisError = InfraError::Status { status: 400, body: String::new() }.into();
        assert_eq!(Attempt::first(&policy).after_failure(&policy, &bad_request), Step::GiveUp);
    }

    #[tokio::test]
    async fn always_failing_operation_runs_max_plus_one_times() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_with_backoff(&policy, &sleeper, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;

        assert_eq!(result, Err(transient()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400)
            ]
        );
    }

    #[tokio::test]
    async fn succeeds_after_two_failures() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let result = retry_with_backoff(&policy, &sleeper, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(AnalysisError::from(InfraError::RateLimited))
                } else {
                    Ok("page")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("page"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.delays.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn non_retryable_error_runs_once() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let bad_request: AnalysisError = InfraError::Status { status: 400, body: "bad".into() }.into();

        let result: Result<(), _> = retry_with_backoff(&policy, &sleeper, || {
            calls.fetch_add(1, Ordering::SeqCst);
            let err = bad_request.clone();
            async move { Err(err) }
        })
        .await;

        assert_eq!(result, Err(bad_request));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = RetryPolicy::new(1, Duration::from_millis(100))
            .with_jitter(Duration::from_millis(50));
        for _ in 0..20 {
            let delay = policy.jittered(Duration::from_millis(100));
            assert!(delay >= Duration::from_millis(100) && delay <= Duration::from_millis(150));
        }
    }

    #[test]
    fn oversized_jitter_is_clamped() {
        let policy = RetryPolicy::new(1, Duration::from_millis(100))
            .with_jitter(Duration::from_secs(u64::MAX));
        let delay = policy.jittered(Duration::from_millis(100));
        assert!(delay >= Duration::from_millis(100));
    }
}
