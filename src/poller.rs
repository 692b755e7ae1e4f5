// src/poller.rs
//! The poll loop for one source: fetch every symbol, aggregate, publish once, sleep.
//!
//! A symbol's failure never escapes its own slot in the cycle, and a failed
//! publish never stops the loop. Configuration is re-read at the top of every
//! cycle, so symbol and timing changes apply without a restart.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio_util::sync::CancellationToken;

use crate::config::{ConfigResolver, PollSettings, SourceSettings};
use crate::error::{ConfigError, FetchError, PublishError};
use crate::publish::QueuePublisher;
use crate::ratelimit::RateLimiter;
use crate::record::{SentimentRecord, Source, Symbol};
use crate::retry::RetryPolicy;
use crate::sources::RecordSource;
use crate::telemetry::{
    CONFIG_ERRORS_TOTAL, CYCLES_TOTAL, CYCLE_DURATION_MS, FETCH_ERRORS_TOTAL, LAST_CYCLE_TS,
    PUBLISH_ERRORS_TOTAL, PUBLISH_TOTAL, RECORDS_TOTAL,
};

/// How one symbol fared in a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolOutcome {
    Records(usize),
    Empty,
    Failed(FetchError),
}

#[derive(Debug)]
pub enum PublishOutcome {
    /// Nothing to send this cycle.
    Skipped,
    Published(usize),
    Failed(PublishError),
}

/// Result of one fetch → aggregate → publish pass.
#[derive(Debug)]
pub struct CycleReport {
    pub source: Source,
    /// In configured symbol order.
    pub symbols: Vec<(Symbol, SymbolOutcome)>,
    pub publish: PublishOutcome,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn record_count(&self) -> usize {
        self.symbols
            .iter()
            .map(|(_, o)| match o {
                SymbolOutcome::Records(n) => *n,
                _ => 0,
            })
            .sum()
    }

    pub fn failed_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols
            .iter()
            .filter(|(_, o)| matches!(o, SymbolOutcome::Failed(_)))
            .map(|(s, _)| s)
    }

    pub fn outcome(&self, symbol: &str) -> Option<&SymbolOutcome> {
        self.symbols
            .iter()
            .find(|(s, _)| s.as_str() == symbol)
            .map(|(_, o)| o)
    }
}

/// What a cycle needs from configuration, resolved fresh each time.
#[derive(Debug, Clone)]
struct CyclePlan {
    symbols: Vec<Symbol>,
    settings: PollSettings,
}

impl CyclePlan {
    fn resolve(cfg: &ConfigResolver) -> Result<Self, ConfigError> {
        Ok(Self {
            symbols: cfg.symbols()?,
            settings: PollSettings::resolve(cfg)?,
        })
    }
}

/// Drives one adapter. Cheap to construct; run one per source as its own task.
pub struct Poller {
    source: Arc<dyn RecordSource>,
    publisher: Arc<dyn QueuePublisher>,
    config: ConfigResolver,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl Poller {
    pub fn new(
        source: Arc<dyn RecordSource>,
        publisher: Arc<dyn QueuePublisher>,
        config: ConfigResolver,
        limiter: RateLimiter,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            source,
            publisher,
            config,
            limiter,
            retry,
        }
    }

    /// Limiter from `<SRC>_FILL_RATE` / `<SRC>_CAPACITY`, retry policy from the `RETRY_*` keys.
    pub fn from_config(
        source: Arc<dyn RecordSource>,
        publisher: Arc<dyn QueuePublisher>,
        config: ConfigResolver,
    ) -> Result<Self, ConfigError> {
        let settings = SourceSettings::resolve(&config, source.source())?;
        let retry = RetryPolicy::from_config(&config)?;
        Ok(Self::new(
            source,
            publisher,
            config,
            RateLimiter::for_source(&settings),
            retry,
        ))
    }

    pub fn source(&self) -> Source {
        self.source.source()
    }

    fn label(&self) -> &'static str {
        self.source.source().platform()
    }

    /// One full cycle. Fails only when the symbol set or poll settings do not resolve.
    pub async fn run_cycle(&self) -> Result<CycleReport, ConfigError> {
        let plan = CyclePlan::resolve(&self.config)?;
        Ok(self.execute(&plan).await)
    }

    /// Poll until `cancel` fires. Cancellation is observed between cycles and
    /// during the sleep; a cycle in flight runs to completion.
    pub async fn run(&self, cancel: CancellationToken) {
        let label = self.label();
        tracing::info!(source = label, "poller started");
        let mut interval = PollSettings::default().interval;

        loop {
            if cancel.is_cancelled() {
                break;
            }
            match CyclePlan::resolve(&self.config) {
                Ok(plan) => {
                    interval = plan.settings.interval;
                    self.execute(&plan).await;
                }
                Err(e) => {
                    tracing::error!(source = label, error = %e, "cycle skipped: configuration did not resolve");
                    counter!(CONFIG_ERRORS_TOTAL, "source" => label).increment(1);
                }
            }

            tracing::info!(source = label, sleep_secs = interval.as_secs(), "sleeping");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        tracing::info!(source = label, "poller stopped");
    }

    async fn execute(&self, plan: &CyclePlan) -> CycleReport {
        let label = self.label();
        let started = Instant::now();
        tracing::info!(source = label, symbols = plan.symbols.len(), "cycle started");

        let timeout = plan.settings.symbol_timeout;
        let results: Vec<(Symbol, Result<Vec<SentimentRecord>, FetchError>)> =
            stream::iter(plan.symbols.clone())
                .map(|sym| async move {
                    let res = self.fetch_symbol(&sym, timeout).await;
                    (sym, res)
                })
                .buffered(plan.settings.concurrency.max(1))
                .collect()
                .await;

        let mut batch = Vec::new();
        let mut symbols = Vec::with_capacity(results.len());
        for (sym, res) in results {
            let outcome = match res {
                Ok(records) if records.is_empty() => SymbolOutcome::Empty,
                Ok(records) => {
                    let n = records.len();
                    batch.extend(records);
                    SymbolOutcome::Records(n)
                }
                Err(e) => {
                    tracing::warn!(source = label, symbol = %sym, kind = e.kind(), error = %e, "fetch failed");
                    counter!(FETCH_ERRORS_TOTAL, "source" => label, "kind" => e.kind()).increment(1);
                    SymbolOutcome::Failed(e)
                }
            };
            symbols.push((sym, outcome));
        }

        let publish = self.publish(&batch).await;

        let elapsed = started.elapsed();
        counter!(CYCLES_TOTAL, "source" => label).increment(1);
        histogram!(CYCLE_DURATION_MS, "source" => label).record(elapsed.as_millis() as f64);
        gauge!(LAST_CYCLE_TS, "source" => label).set(chrono::Utc::now().timestamp() as f64);

        let report = CycleReport {
            source: self.source(),
            symbols,
            publish,
            elapsed,
        };
        tracing::info!(
            source = label,
            records = report.record_count(),
            failed = report.failed_symbols().count(),
            elapsed_ms = elapsed.as_millis() as u64,
            "cycle finished"
        );
        report
    }

    /// Rate-limited, retried and time-bounded fetch of one symbol.
    ///
    /// Every attempt first draws the source's per-fetch token cost. Time spent
    /// waiting on the limiter pushes the deadline back, so `budget` bounds only
    /// the fetch and backoff work and a throttled symbol is never cut off.
    async fn fetch_symbol(
        &self,
        symbol: &Symbol,
        budget: Duration,
    ) -> Result<Vec<SentimentRecord>, FetchError> {
        let label = self.label();
        let cost = self.source.requests_per_fetch();
        let mut deadline = tokio::time::Instant::now() + budget;
        let mut attempt = 1;

        loop {
            deadline += self.limiter.acquire_many(label, cost).await;
            let err = match tokio::time::timeout_at(deadline, self.source.fetch_records(symbol)).await {
                Ok(Ok(records)) => return Ok(records),
                Ok(Err(e)) => e,
                Err(_) => {
                    return Err(FetchError::transient(format!(
                        "no result within {}s",
                        budget.as_secs()
                    )))
                }
            };
            let Some(next) = self.retry.next_attempt(attempt, &err) else {
                return Err(err);
            };
            if tokio::time::Instant::now() + next.delay >= deadline {
                tracing::debug!(source = label, %symbol, "no time left for another attempt");
                return Err(err);
            }
            self.retry.pause(label, &next).await;
            attempt = next.attempt;
        }
    }

    async fn publish(&self, batch: &[SentimentRecord]) -> PublishOutcome {
        let label = self.label();
        if batch.is_empty() {
            tracing::info!(source = label, "no records this cycle");
            return PublishOutcome::Skipped;
        }
        match self.publisher.publish(batch).await {
            Ok(()) => {
                tracing::info!(
                    source = label,
                    transport = self.publisher.transport(),
                    count = batch.len(),
                    "published batch"
                );
                counter!(PUBLISH_TOTAL, "source" => label).increment(1);
                counter!(RECORDS_TOTAL, "source" => label).increment(batch.len() as u64);
                PublishOutcome::Published(batch.len())
            }
            Err(e) => {
                tracing::error!(
                    source = label,
                    transport = self.publisher.transport(),
                    count = batch.len(),
                    error = %e,
                    "publish failed; batch dropped"
                );
                counter!(PUBLISH_ERRORS_TOTAL, "source" => label).increment(1);
                PublishOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticValues;
    use crate::publish::RecordingPublisher;
    use crate::sources::social_mock::SocialMockAdapter;

    fn cfg(symbols: &str) -> ConfigResolver {
        ConfigResolver::from_values(
            StaticValues::new()
                .with("SYMBOLS", symbols)
                .with("POLL_INTERVAL", "1"),
        )
    }

    #[tokio::test]
    async fn mock_source_cycle_publishes_one_batch() {
        let publisher = Arc::new(RecordingPublisher::new());
        let poller = Poller::from_config(Arc::new(SocialMockAdapter), publisher.clone(), cfg("tsla, gme"))
            .unwrap();
        let report = poller.run_cycle().await.unwrap();
        assert_eq!(report.record_count(), 2);
        assert!(matches!(report.publish, PublishOutcome::Published(2)));
        let batches = publisher.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0].symbol().as_str(), "TSLA");
        assert_eq!(batches[0][1].symbol().as_str(), "GME");
    }

    #[tokio::test]
    async fn missing_symbols_fail_the_cycle_without_publishing() {
        let publisher = Arc::new(RecordingPublisher::new());
        let poller = Poller::new(
            Arc::new(SocialMockAdapter),
            publisher.clone(),
            ConfigResolver::from_values(StaticValues::new()),
            RateLimiter::new(5.0, 5),
            RetryPolicy::no_retry(),
        );
        let err = poller.run_cycle().await.unwrap_err();
        assert_eq!(err, ConfigError::missing("SYMBOLS"));
        assert_eq!(publisher.publish_count(), 0);
    }

    #[test]
    fn report_lookups() {
        let report = CycleReport {
            source: Source::Finviz,
            symbols: vec![
                (Symbol::parse("A").unwrap(), SymbolOutcome::Records(3)),
                (Symbol::parse("B").unwrap(), SymbolOutcome::Empty),
                (
                    Symbol::parse("C").unwrap(),
                    SymbolOutcome::Failed(FetchError::permanent("404")),
                ),
            ],
            publish: PublishOutcome::Published(3),
            elapsed: Duration::ZERO,
        };
        assert_eq!(report.record_count(), 3);
        assert_eq!(report.failed_symbols().count(), 1);
        assert_eq!(report.outcome("B"), Some(&SymbolOutcome::Empty));
    }
}
