// src/retry.rs
//! Bounded retry with exponential backoff for one symbol's fetch.

use std::future::Future;
use std::time::Duration;

use metrics::counter;

use crate::config::{keys, ConfigResolver};
use crate::error::{ConfigError, FetchError};
use crate::telemetry::FETCH_RETRIES_TOTAL;

/// Exponential backoff clamped to `[min, max]`.
///
/// The delay after `n` failed attempts is `multiplier * 2^(n-1)` seconds, clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Seconds.
    pub multiplier: f64,
    pub min: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            min: Duration::from_secs(2),
            max: Duration::from_secs(10),
        }
    }
}

impl Backoff {
    /// `failed` is the number of attempts that have failed so far (1-based).
    pub fn delay(&self, failed: u32) -> Duration {
        let exp = failed.saturating_sub(1).min(62) as i32;
        let seconds = self.multiplier.max(0.0) * 2_f64.powi(exp);
        let clamped = seconds
            .max(self.min.as_secs_f64())
            .min(self.max.as_secs_f64());
        Duration::from_secs_f64(clamped)
    }
}

/// Bookkeeping for one scheduled retry.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryAttempt {
    /// The attempt about to run (2 for the first retry).
    pub attempt: u32,
    pub last_error: FetchError,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        let (min, max) = if backoff.min <= backoff.max {
            (backoff.min, backoff.max)
        } else {
            (backoff.max, backoff.min)
        };
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff { min, max, ..backoff },
        }
    }

    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self::new(1, Backoff::default())
    }

    /// `ENABLE_RETRY`, `MAX_RETRIES`, `RETRY_MULTIPLIER`, `RETRY_MIN_DELAY`, `RETRY_MAX_DELAY`.
    pub fn from_config(cfg: &ConfigResolver) -> Result<Self, ConfigError> {
        if !cfg.as_bool(keys::ENABLE_RETRY, true) {
            return Ok(Self::no_retry());
        }
        let max_attempts = cfg.as_int(keys::MAX_RETRIES, Some(3))?;
        let backoff = Backoff {
            multiplier: cfg.as_float(keys::RETRY_MULTIPLIER, Some(1.0))?,
            min: Duration::from_secs_f64(cfg.as_float(keys::RETRY_MIN_DELAY, Some(2.0))?.max(0.0)),
            max: Duration::from_secs_f64(cfg.as_float(keys::RETRY_MAX_DELAY, Some(10.0))?.max(0.0)),
        };
        Ok(Self::new(u32::try_from(max_attempts).unwrap_or(u32::MAX), backoff))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Decide whether attempt `attempt` failing with `err` earns another try.
    pub fn next_attempt(&self, attempt: u32, err: &FetchError) -> Option<RetryAttempt> {
        if !err.is_transient() || attempt >= self.max_attempts {
            return None;
        }
        Some(RetryAttempt {
            attempt: attempt + 1,
            last_error: err.clone(),
            delay: self.backoff.delay(attempt),
        })
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 1;
        loop {
            let err = match op(attempt).await {
                Ok(v) => return Ok(v),
                Err(e) => e,
            };
            let Some(next) = self.next_attempt(attempt, &err) else {
                return Err(err);
            };
            self.pause(label, &next).await;
            attempt = next.attempt;
        }
    }

    /// Log and count a scheduled retry, then sleep its backoff delay.
    pub async fn pause(&self, label: &str, next: &RetryAttempt) {
        tracing::debug!(
            source = label,
            attempt = next.attempt,
            max_attempts = self.max_attempts,
            delay_ms = next.delay.as_millis() as u64,
            error = %next.last_error,
            "retrying after transient error"
        );
        counter!(FETCH_RETRIES_TOTAL, "source" => label.to_string()).increment(1);
        tokio::time::sleep(next.delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn default_backoff_matches_exponential_with_floor() {
        let b = Backoff::default();
        assert_eq!(b.delay(1), Duration::from_secs(2)); // 1s raised to min
        assert_eq!(b.delay(2), Duration::from_secs(2));
        assert_eq!(b.delay(3), Duration::from_secs(4));
        assert_eq!(b.delay(4), Duration::from_secs(8));
        assert_eq!(b.delay(5), Duration::from_secs(10)); // capped
        assert_eq!(b.delay(40), Duration::from_secs(10));
    }

    #[test]
    fn delays_are_non_decreasing_and_within_window() {
        let b = Backoff {
            multiplier: 0.3,
            min: Duration::from_millis(500),
            max: Duration::from_secs(7),
        };
        let mut prev = Duration::ZERO;
        for n in 1..20 {
            let d = b.delay(n);
            assert!(d >= b.min && d <= b.max, "n={n} d={d:?}");
            assert!(d >= prev);
            prev = d;
        }
    }

    #[test]
    fn inverted_window_is_swapped() {
        let p = RetryPolicy::new(
            3,
            Backoff {
                multiplier: 1.0,
                min: Duration::from_secs(9),
                max: Duration::from_secs(1),
            },
        );
        assert_eq!(p.backoff().min, Duration::from_secs(1));
        assert_eq!(p.backoff().max, Duration::from_secs(9));
    }

    #[test]
    fn next_attempt_respects_kind_and_bound() {
        let p = RetryPolicy::default();
        let t = FetchError::transient("timeout");
        assert_eq!(p.next_attempt(1, &t).map(|a| a.attempt), Some(2));
        assert_eq!(p.next_attempt(2, &t).map(|a| a.attempt), Some(3));
        assert!(p.next_attempt(3, &t).is_none());
        assert!(p.next_attempt(1, &FetchError::permanent("404")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_attempts_on_persistent_transient_error() {
        let calls = &AtomicU32::new(0);
        let p = RetryPolicy::default();
        let res: Result<(), _> = p
            .run("test", move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::transient("reset"))
            })
            .await;
        assert!(res.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_retry_is_single_shot() {
        let calls = &AtomicU32::new(0);
        let p = RetryPolicy::no_retry();
        let _ = p
            .run("test", move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(FetchError::transient("reset"))
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
