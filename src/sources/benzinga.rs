// src/sources/benzinga.rs
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{AdapterContext, SourceAdapter};
use crate::config::keys;
use crate::error::{ConfigError, FetchError};
use crate::http::send_json;
use crate::record::{SentimentRecord, Source, Symbol};

const DEFAULT_URL: &str = "https://api.benzinga.com/api/v2/news";
const PAGE_SIZE: &str = "10";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewsItem {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub teaser: Option<String>,
    pub url: Option<String>,
    pub created: Option<String>,
    /// Not part of the documented schema; passed through when present.
    pub sentiment: Option<Value>,
}

pub struct BenzingaAdapter {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    timeout: Duration,
}

impl BenzingaAdapter {
    pub fn from_context(ctx: &AdapterContext) -> Result<Self, ConfigError> {
        Ok(Self {
            http: ctx.http.clone(),
            endpoint: ctx.settings.endpoint_or(DEFAULT_URL),
            token: ctx.config.require_non_empty(keys::BENZINGA_API_KEY)?,
            timeout: ctx.settings.request_timeout,
        })
    }
}

fn sentiment_label(v: Option<Value>) -> String {
    match v {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl SourceAdapter for BenzingaAdapter {
    type Item = NewsItem;

    const SOURCE: Source = Source::Benzinga;

    async fn fetch(&self, symbol: &Symbol) -> Result<Vec<NewsItem>, FetchError> {
        // the newswire answers XML unless asked otherwise
        let req = self
            .http
            .get(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[
                ("token", self.token.as_str()),
                ("symbols", symbol.as_str()),
                ("pagesize", PAGE_SIZE),
            ]);
        send_json(req, self.timeout).await
    }

    fn normalize(&self, symbol: &Symbol, item: NewsItem) -> SentimentRecord {
        let summary = item.summary.or(item.teaser);
        SentimentRecord::builder(symbol, Self::SOURCE)
            .timestamp(item.created.as_deref())
            .text("headline", item.title.as_deref())
            .text("summary", summary.as_deref())
            .field("url", item.url.unwrap_or_default())
            .field("sentiment", sentiment_label(item.sentiment))
            .build()
    }
}
