//! Retry policy applied to every controller call.
//!
//! A policy maps error-message substrings to retry caps. Each failed attempt
//! is rendered to a string and compared, in declaration order, against the
//! configured substrings; the first hit decides how many retries are allowed.
//! Errors that match nothing fail immediately.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::SdkError;
use crate::telemetry;

const DEFAULT_BACKOFF: Duration = Duration::from_millis(200);
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(5);

/// One retry rule: retry up to `retries` times while the error contains `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRetry {
    pub message: String,
    pub retries: u32,
}

impl ErrorRetry {
    pub fn new(message: impl Into<String>, retries: u32) -> Self {
        Self {
            message: message.into(),
            retries,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    timeout: Duration,
    errors: Vec<ErrorRetry>,
    backoff: Duration,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::ZERO,
            errors: Vec::new(),
            backoff: DEFAULT_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// `timeout` of zero disables the overall deadline. Rules with an empty
    /// message would match every error and are dropped.
    pub fn new(timeout: Duration, errors: Vec<ErrorRetry>) -> Self {
        let errors = errors
            .into_iter()
            .filter(|rule| !rule.message.is_empty())
            .collect();
        Self {
            timeout,
            errors,
            ..Self::default()
        }
    }

    pub fn with_backoff(mut self, backoff: Duration, max_backoff: Duration) -> Self {
        self.backoff = backoff;
        self.max_backoff = max_backoff.max(backoff);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn errors(&self) -> &[ErrorRetry] {
        &self.errors
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// `attempt` counts failures so far, starting at 1.
    pub fn should_retry(&self, message: &str, attempt: u32) -> bool {
        self.errors
            .iter()
            .find(|rule| message.contains(rule.message.as_str()))
            .is_some_and(|rule| attempt <= rule.retries)
    }

    fn deadline(&self, started: Instant) -> Option<Instant> {
        if self.timeout.is_zero() {
            None
        } else {
            Some(started + self.timeout)
        }
    }
}

/// Shared, swappable retry policy.
///
/// Clones share the same slot. [`RetrySettings::set`] replaces the whole
/// policy; calls already in flight keep the snapshot they started with.
#[derive(Debug, Clone)]
pub struct RetrySettings {
    current: Arc<ArcSwap<RetryPolicy>>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl RetrySettings {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(policy)),
        }
    }

    pub fn set(&self, policy: RetryPolicy) {
        self.current.store(Arc::new(policy));
    }

    pub fn snapshot(&self) -> Arc<RetryPolicy> {
        self.current.load_full()
    }
}

pub fn backoff_with_jitter(base: Duration, max: Duration, attempt: u32) -> Duration {
    let exp = 2u32.saturating_pow(attempt.saturating_sub(1));
    let mut backoff = base.saturating_mul(exp);
    if backoff > max {
        backoff = max;
    }
    let jitter_max = backoff.as_millis() / 2;
    let jitter_ms: u128 = rand::rng().random_range(0..=jitter_max.max(1));
    backoff + Duration::from_millis(jitter_ms as u64)
}

/// Runs `attempt_fn` until it succeeds, the policy stops matching, or the
/// deadline passes. On deadline the last observed error is returned; if no
/// attempt finished yet the result is [`SdkError::Timeout`].
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut attempt_fn: F,
) -> Result<T, SdkError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SdkError>>,
{
    let deadline = policy.deadline(Instant::now());
    let mut attempt: u32 = 0;
    let mut last_error: Option<SdkError> = None;

    loop {
        let outcome = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, attempt_fn()).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    debug!(operation, attempt, "retry deadline elapsed mid-attempt");
                    return Err(last_error.unwrap_or(SdkError::Timeout(policy.timeout)));
                }
            },
            None => attempt_fn().await,
        };

        let err = match outcome {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        attempt += 1;
        let message = err.to_string();
        if !err.is_retryable() || !policy.should_retry(&message, attempt) {
            return Err(err);
        }

        let backoff = backoff_with_jitter(policy.backoff, policy.max_backoff, attempt);
        if let Some(deadline) = deadline
            && Instant::now() + backoff >= deadline
        {
            debug!(operation, attempt, "retry deadline leaves no room for another attempt");
            return Err(err);
        }

        warn!(
            operation,
            attempt,
            backoff_ms = backoff.as_millis(),
            error = %message,
            "controller call failed, backing off"
        );
        telemetry::record_retry(operation);
        tokio::time::sleep(backoff).await;
        last_error = Some(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn connection_reset_policy(retries: u32) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_secs(5),
            vec![ErrorRetry::new("connection reset", retries)],
        )
        .with_backoff(Duration::from_millis(10), Duration::from_millis(20))
    }

    #[test]
    fn should_retry_uses_first_matching_rule() {
        let policy = RetryPolicy::new(
            Duration::ZERO,
            vec![ErrorRetry::new("reset", 1), ErrorRetry::new("connection reset", 5)],
        );
        assert!(policy.should_retry("connection reset by peer", 1));
        assert!(!policy.should_retry("connection reset by peer", 2));
    }

    #[test]
    fn empty_rule_messages_are_dropped() {
        let policy = RetryPolicy::new(
            Duration::ZERO,
            vec![ErrorRetry::new("", 9), ErrorRetry::new("EOF", 1)],
        );
        assert_eq!(policy.errors(), &[ErrorRetry::new("EOF", 1)]);
        assert!(!policy.should_retry("database unavailable", 1));
        assert!(policy.should_retry("unexpected EOF", 1));
    }

    #[test]
    fn should_retry_is_case_sensitive_and_requires_a_match() {
        let policy = connection_reset_policy(3);
        assert!(policy.should_retry("read: connection reset by peer", 3));
        assert!(!policy.should_retry("read: connection reset by peer", 4));
        assert!(!policy.should_retry("Connection Reset", 1));
        assert!(!policy.should_retry("bad request", 1));
    }

    #[test]
    fn backoff_with_jitter_caps_and_adds_jitter() {
        let base = Duration::from_millis(100);
        let max = Duration::from_millis(300);
        let first = backoff_with_jitter(base, max, 1);
        assert!(first >= base && first <= base + Duration::from_millis(50));
        let capped = backoff_with_jitter(base, max, 10);
        assert!(capped >= max && capped <= max + Duration::from_millis(150));
    }

    #[test]
    fn settings_swap_whole_policy() {
        let settings = RetrySettings::default();
        let before = settings.snapshot();
        assert!(before.errors().is_empty());

        let shared = settings.clone();
        shared.set(connection_reset_policy(3));

        let after = settings.snapshot();
        assert_eq!(after.errors().len(), 1);
        assert_eq!(after.timeout(), Duration::from_secs(5));
        assert!(before.errors().is_empty(), "old snapshot stays intact");
    }

    #[tokio::test(start_paused = true)]
    async fn matching_errors_are_retried_up_to_cap() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = connection_reset_policy(3);

        let counter = calls.clone();
        let result: Result<(), SdkError> = run_with_retry(&policy, "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SdkError::Transport("connection reset by peer".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(SdkError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 4, "one call plus three retries");
    }

    #[tokio::test(start_paused = true)]
    async fn non_matching_errors_fail_fast() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = connection_reset_policy(3);

        let counter = calls.clone();
        let result: Result<(), SdkError> = run_with_retry(&policy, "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SdkError::Transport("tls handshake eof".into()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn input_errors_are_never_retried_even_when_matching() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = connection_reset_policy(3);

        let counter = calls.clone();
        let result: Result<(), SdkError> = run_with_retry(&policy, "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SdkError::Input("connection reset".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(SdkError::Input(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_when_a_later_attempt_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = connection_reset_policy(3);

        let counter = calls.clone();
        let result = run_with_retry(&policy, "test", || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(SdkError::Transport("connection reset".into()))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.expect("third attempt succeeds"), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_stops_retries_and_returns_last_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::new(
            Duration::from_secs(5),
            vec![ErrorRetry::new("connection reset", 100)],
        )
        .with_backoff(Duration::from_secs(2), Duration::from_secs(60));

        let counter = calls.clone();
        let result: Result<(), SdkError> = run_with_retry(&policy, "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SdkError::Transport("connection reset".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(SdkError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_first_attempt_times_out() {
        let policy = RetryPolicy::new(Duration::from_secs(1), Vec::new());
        let result: Result<(), SdkError> = run_with_retry(&policy, "test", || async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(SdkError::Timeout(_))));
    }
}
