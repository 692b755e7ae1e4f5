// src/sources/seeking_alpha.rs
use std::time::Duration;

use async_trait::async_trait;

use super::rss::{parse_feed, FeedItem};
use super::{AdapterContext, SourceAdapter};
use crate::error::FetchError;
use crate::http::send_text;
use crate::record::{SentimentRecord, Source, Symbol};

const DEFAULT_URL: &str = "https://seekingalpha.com/api/sa/combined";
const SOURCE_NAME: &str = "Seeking Alpha";

pub struct SeekingAlphaAdapter {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl SeekingAlphaAdapter {
    pub fn from_context(ctx: &AdapterContext) -> Self {
        Self {
            http: ctx.http.clone(),
            endpoint: ctx.settings.endpoint_or(DEFAULT_URL),
            timeout: ctx.settings.request_timeout,
        }
    }
}

#[async_trait]
impl SourceAdapter for SeekingAlphaAdapter {
    type Item = FeedItem;

    const SOURCE: Source = Source::SeekingAlpha;

    async fn fetch(&self, symbol: &Symbol) -> Result<Vec<FeedItem>, FetchError> {
        let url = format!("{}/{}.xml", self.endpoint, urlencoding::encode(symbol.as_str()));
        let body = send_text(self.http.get(url), self.timeout).await?;
        let items = parse_feed(&body)?;
        tracing::debug!(source = "seeking_alpha", %symbol, count = items.len(), "parsed feed");
        Ok(items)
    }

    fn normalize(&self, symbol: &Symbol, item: FeedItem) -> SentimentRecord {
        SentimentRecord::builder(symbol, Self::SOURCE)
            .timestamp(item.pub_date.as_deref())
            .text("headline", item.title.as_deref())
            .text("summary", item.description.as_deref())
            .field("url", item.link.unwrap_or_default())
            .field("source_name", SOURCE_NAME)
            .build()
    }
}
