// tests/rate_limiter.rs
use std::time::{Duration, Instant};

use sentiment_poller::config::{ConfigResolver, SourceSettings, StaticValues};
use sentiment_poller::{RateLimiter, Source};

#[tokio::test]
async fn burst_then_refill_wait() {
    // capacity 3, 10 tokens/s: three immediate, the fourth after ~100ms
    let rl = RateLimiter::new(10.0, 3);
    let started = Instant::now();
    for _ in 0..3 {
        rl.acquire("test").await;
    }
    assert!(started.elapsed() < Duration::from_millis(50));

    rl.acquire("test").await;
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(80), "waited {waited:?}");
    assert!(waited < Duration::from_millis(500), "waited {waited:?}");
}

#[tokio::test]
async fn concurrent_acquirers_are_paced() {
    let rl = RateLimiter::new(20.0, 1);
    let started = Instant::now();
    let tasks: Vec<_> = (0..5)
        .map(|_| {
            let rl = rl.clone();
            tokio::spawn(async move { rl.acquire("test").await })
        })
        .collect();
    for t in tasks {
        t.await.unwrap();
    }
    // 1 immediate + 4 at 50ms spacing
    assert!(started.elapsed() >= Duration::from_millis(180));
}

#[test]
fn limiter_follows_source_settings() {
    let cfg = ConfigResolver::from_values(
        StaticValues::new()
            .with("FINVIZ_FILL_RATE", "0.5")
            .with("FINVIZ_CAPACITY", "2"),
    );
    let settings = SourceSettings::resolve(&cfg, Source::Finviz).unwrap();
    let rl = RateLimiter::for_source(&settings);
    assert_eq!(rl.capacity(), 2);
    assert_eq!(rl.fill_rate(), 0.5);
    assert!(rl.try_acquire());
    assert!(rl.try_acquire());
    assert!(!rl.try_acquire());
}

#[test]
fn vanishing_fill_rate_is_rejected_by_settings() {
    let cfg = ConfigResolver::from_values(StaticValues::new().with("FINVIZ_FILL_RATE", "1e-20"));
    let err = SourceSettings::resolve(&cfg, Source::Finviz).unwrap_err();
    assert_eq!(err.key(), "FINVIZ_FILL_RATE");

    // one token per day is the slowest accepted refill
    let cfg = ConfigResolver::from_values(StaticValues::new().with("FINVIZ_FILL_RATE", "0.0000116"));
    let settings = SourceSettings::resolve(&cfg, Source::Finviz).unwrap();
    let rl = RateLimiter::for_source(&settings);
    assert!(rl.try_acquire());
    assert!(!rl.try_acquire());
}

#[test]
fn non_positive_fill_rate_is_rejected_by_settings() {
    let cfg = ConfigResolver::from_values(StaticValues::new().with("NEWSAPI_FILL_RATE", "0"));
    let err = SourceSettings::resolve(&cfg, Source::NewsApi).unwrap_err();
    assert_eq!(err.key(), "NEWSAPI_FILL_RATE");
}
