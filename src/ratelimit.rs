// src/ratelimit.rs
//! Per-source token bucket.
//!
//! `capacity` is a token count and `fill_rate` is tokens per second. The bucket is
//! backed by governor's GCRA limiter, which refills lazily on each check and is
//! equivalent to a token bucket with continuous refill. Clones share one bucket.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter as Gcra};
use metrics::counter;

use crate::config::SourceSettings;
use crate::telemetry::THROTTLE_WAITS_TOTAL;

/// Slowest accepted refill: one token per day.
pub const MIN_FILL_RATE: f64 = 1.0 / 86_400.0;

type DirectRateLimiter = Gcra<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Clone)]
pub struct RateLimiter {
    bucket: Arc<DirectRateLimiter>,
    fill_rate: f64,
    capacity: u32,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("fill_rate", &self.fill_rate)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl RateLimiter {
    /// Non-positive or non-finite rates fall back to one token per second and
    /// rates below [`MIN_FILL_RATE`] are raised to it; a zero capacity is raised to one.
    pub fn new(fill_rate: f64, capacity: u32) -> Self {
        let fill_rate = if fill_rate.is_finite() && fill_rate > 0.0 {
            fill_rate.max(MIN_FILL_RATE)
        } else {
            1.0
        };
        let capacity = capacity.max(1);
        Self {
            bucket: Arc::new(Gcra::direct(quota(fill_rate, capacity))),
            fill_rate,
            capacity,
        }
    }

    pub fn for_source(settings: &SourceSettings) -> Self {
        Self::new(settings.fill_rate, settings.capacity)
    }

    pub fn fill_rate(&self) -> f64 {
        self.fill_rate
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Wait until a token is available and take it. Never fails; under sustained
    /// contention it waits as long as it takes. Returns how long it waited.
    pub async fn acquire(&self, label: &str) -> Duration {
        if self.bucket.check().is_ok() {
            return Duration::ZERO;
        }
        tracing::debug!(source = label, "rate limit reached, waiting for a token");
        counter!(THROTTLE_WAITS_TOTAL, "source" => label.to_string()).increment(1);
        let started = Instant::now();
        self.bucket.until_ready().await;
        started.elapsed()
    }

    /// Take `tokens` tokens one at a time, so costs above the capacity still drain.
    pub async fn acquire_many(&self, label: &str, tokens: u32) -> Duration {
        let mut waited = Duration::ZERO;
        for _ in 0..tokens.max(1) {
            waited += self.acquire(label).await;
        }
        waited
    }

    /// Take a token if one is available right now.
    pub fn try_acquire(&self) -> bool {
        self.bucket.check().is_ok()
    }
}

fn quota(fill_rate: f64, capacity: u32) -> Quota {
    let burst = NonZeroU32::new(capacity).unwrap_or(NonZeroU32::MIN);
    // Sub-microsecond periods are not meaningful for outbound HTTP.
    let period = Duration::try_from_secs_f64((1.0 / fill_rate).clamp(0.000_001, 1.0 / MIN_FILL_RATE))
        .unwrap_or(Duration::from_secs(1));
    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
        .allow_burst(burst)
}
