// src/services/retry.rs
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::observer::RunObserver;

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
    /// Upper bound for a single attempt. `None` waits as long as the attempt takes.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            multiplier: 2.0,
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, multiplier: f64) -> Self {
        RetryPolicy {
            max_attempts,
            initial_delay,
            multiplier,
            attempt_timeout: None,
        }
    }

    /// A policy that runs the operation exactly once.
    pub fn no_retry() -> Self {
        RetryPolicy::new(1, Duration::ZERO, 1.0)
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Attempts actually made; zero is treated as one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Waits between consecutive attempts, in order. One fewer than `attempts()`.
    pub fn delays(&self) -> Vec<Duration> {
        let mut delays = Vec::new();
        let mut delay = self.initial_delay;
        for _ in 1..self.attempts() {
            delays.push(delay);
            delay = self.next_delay(delay);
        }
        delays
    }

    // No cap: saturates only where Duration itself runs out.
    fn next_delay(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.multiplier).unwrap_or(Duration::MAX)
    }
}

/// Runs `operation` until it succeeds or the policy's attempts are used up.
///
/// The first attempt starts immediately. Every failure except the last is
/// reported to `observer` as a warning carrying the error and the upcoming
/// wait, then the run sleeps for that wait. The last failure is returned
/// untouched and left for the caller to report. Success values pass through
/// as-is.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    observer: &dyn RunObserver,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.attempts();
    let mut delay = policy.initial_delay;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                observer.warn(&format!(
                    "{}: attempt {}/{} failed: {}, retrying in {:?}",
                    label, attempt, attempts, e, delay
                ));
                tokio::time::sleep(delay).await;
                delay = policy.next_delay(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{Level, RecordingObserver};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    // Paused clock: timer deadlines resolve to the millisecond.
    fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(5),
            "elapsed {:?}, expected {:?}",
            elapsed,
            expected
        );
    }

    #[test]
    fn default_policy_matches_run_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts(), 3);
        assert_eq!(policy.delays(), vec![Duration::from_secs(2), Duration::from_secs(4)]);
    }

    #[test]
    fn zero_attempts_behaves_like_one() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1), 2.0);
        assert_eq!(policy.attempts(), 1);
        assert!(policy.delays().is_empty());
    }

    #[test]
    fn delay_growth_is_uncapped() {
        let policy = RetryPolicy::new(6, Duration::from_secs(1), 10.0);
        assert_eq!(policy.delays().last(), Some(&Duration::from_secs(10_000)));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_returns_last_error() {
        let observer = RecordingObserver::new();
        let calls = &AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), String> =
            retry_with_backoff(&RetryPolicy::default(), &observer, "always-fails", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("failure #{}", n))
            })
            .await;

        assert_eq!(result, Err("failure #3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_elapsed(start, Duration::from_secs(6));

        let warnings = observer.at(Level::Warn);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("failure #1") && warnings[0].contains("2s"));
        assert!(warnings[1].contains("failure #2") && warnings[1].contains("4s"));
        assert!(observer.at(Level::Error).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_second_attempt_after_one_sleep() {
        let observer = RecordingObserver::new();
        let calls = &AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<f64, String> =
            retry_with_backoff(&RetryPolicy::default(), &observer, "flaky", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("transient".to_string())
                } else {
                    Ok(42.5)
                }
            })
            .await;

        assert_eq!(result, Ok(42.5));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_elapsed(start, Duration::from_secs(2));
        assert_eq!(observer.at(Level::Warn).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt_fails_immediately() {
        let observer = RecordingObserver::new();
        let calls = &AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), &str> =
            retry_with_backoff(&RetryPolicy::no_retry(), &observer, "once", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("nope")
            })
            .await;

        assert_eq!(result, Err("nope"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_elapsed(start, Duration::ZERO);
        assert!(observer.lines().is_empty());
    }
}
