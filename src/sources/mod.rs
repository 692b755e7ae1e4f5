// src/sources/mod.rs
//! Source adapters: one implementation per upstream, selected through [`Registry`].
//!
//! Adapters only fetch and reshape. Throttling and retries belong to the poller,
//! which wraps every `fetch` in the source's rate limiter and retry policy. An
//! adapter that makes several requests per `fetch` declares the worst case in
//! `REQUESTS_PER_FETCH` and the poller draws that many tokens.

pub mod benzinga;
pub mod finviz;
pub mod google_news;
pub mod newsapi;
pub mod rss;
pub mod seeking_alpha;
pub mod social_mock;
pub mod stocktwits;
pub mod yahoo_finance;
pub mod youtube;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{keys, ConfigResolver, SourceSettings};
use crate::error::{ConfigError, FetchError};
use crate::record::{SentimentRecord, Source, Symbol};

/// Fetch raw items for one symbol and reshape each into a [`SentimentRecord`].
#[async_trait]
pub trait SourceAdapter: Send + Sync + 'static {
    /// Upstream item as fetched, before normalization.
    type Item: Send + 'static;

    const SOURCE: Source;

    /// Upper bound on outbound requests made by one `fetch`.
    const REQUESTS_PER_FETCH: u32 = 1;

    /// One network round (or a few, for multi-step sources) for `symbol`.
    async fn fetch(&self, symbol: &Symbol) -> Result<Vec<Self::Item>, FetchError>;

    /// Pure and total: every field read from `item` has a fallback.
    fn normalize(&self, symbol: &Symbol, item: Self::Item) -> SentimentRecord;
}

/// Object-safe view of an adapter, as held by the poller.
#[async_trait]
pub trait RecordSource: Send + Sync {
    fn source(&self) -> Source;

    /// Rate-limiter tokens one `fetch_records` call costs.
    fn requests_per_fetch(&self) -> u32 {
        1
    }

    async fn fetch_records(&self, symbol: &Symbol) -> Result<Vec<SentimentRecord>, FetchError>;
}

#[async_trait]
impl<A: SourceAdapter> RecordSource for A {
    fn source(&self) -> Source {
        A::SOURCE
    }

    fn requests_per_fetch(&self) -> u32 {
        A::REQUESTS_PER_FETCH
    }

    async fn fetch_records(&self, symbol: &Symbol) -> Result<Vec<SentimentRecord>, FetchError> {
        let items = self.fetch(symbol).await?;
        Ok(items
            .into_iter()
            .map(|item| self.normalize(symbol, item))
            .collect())
    }
}

/// What a factory gets to build an adapter with.
#[derive(Debug, Clone)]
pub struct AdapterContext {
    pub config: ConfigResolver,
    pub http: reqwest::Client,
    pub settings: SourceSettings,
}

impl AdapterContext {
    pub fn new(config: ConfigResolver, http: reqwest::Client, source: Source) -> Result<Self, ConfigError> {
        let settings = SourceSettings::resolve(&config, source)?;
        Ok(Self {
            config,
            http,
            settings,
        })
    }
}

pub type AdapterFactory = fn(&AdapterContext) -> Result<Arc<dyn RecordSource>, ConfigError>;

/// Source → constructor map.
#[derive(Clone, Default)]
pub struct Registry {
    factories: HashMap<Source, AdapterFactory>,
}

impl Registry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every adapter shipped with the crate.
    pub fn builtin() -> Self {
        let mut r = Self::empty();
        r.register(Source::NewsApi, |ctx| Ok(Arc::new(newsapi::NewsApiAdapter::from_context(ctx)?)));
        r.register(Source::Stocktwits, |ctx| Ok(Arc::new(stocktwits::StocktwitsAdapter::from_context(ctx))));
        r.register(Source::Benzinga, |ctx| Ok(Arc::new(benzinga::BenzingaAdapter::from_context(ctx)?)));
        r.register(Source::GoogleNews, |ctx| Ok(Arc::new(google_news::GoogleNewsAdapter::from_context(ctx))));
        r.register(Source::SeekingAlpha, |ctx| Ok(Arc::new(seeking_alpha::SeekingAlphaAdapter::from_context(ctx))));
        r.register(Source::Finviz, |ctx| Ok(Arc::new(finviz::FinvizAdapter::from_context(ctx))));
        r.register(Source::YahooFinance, |ctx| Ok(Arc::new(yahoo_finance::YahooFinanceAdapter::from_context(ctx))));
        r.register(Source::YouTube, |ctx| Ok(Arc::new(youtube::YouTubeAdapter::from_context(ctx)?)));
        r.register(Source::Reddit, |_| Ok(Arc::new(social_mock::SocialMockAdapter)));
        r
    }

    pub fn register(&mut self, source: Source, factory: AdapterFactory) -> &mut Self {
        self.factories.insert(source, factory);
        self
    }

    pub fn contains(&self, source: Source) -> bool {
        self.factories.contains_key(&source)
    }

    pub fn build(&self, ctx: &AdapterContext) -> Result<Arc<dyn RecordSource>, ConfigError> {
        let source = ctx.settings.source;
        let factory = self.factories.get(&source).ok_or_else(|| {
            ConfigError::invalid(keys::POLLER_TYPE, source.platform(), "no adapter registered")
        })?;
        factory(ctx)
    }
}
