// src/sources/google_news.rs
use std::time::Duration;

use async_trait::async_trait;

use super::rss::{parse_feed, FeedItem};
use super::{AdapterContext, SourceAdapter};
use crate::error::FetchError;
use crate::http::send_text;
use crate::record::{SentimentRecord, Source, Symbol};

const DEFAULT_URL: &str = "https://news.google.com/rss/search";

/// Google News search feed, `"<SYM> stock"`, US English edition.
pub struct GoogleNewsAdapter {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl GoogleNewsAdapter {
    pub fn from_context(ctx: &AdapterContext) -> Self {
        Self {
            http: ctx.http.clone(),
            endpoint: ctx.settings.endpoint_or(DEFAULT_URL),
            timeout: ctx.settings.request_timeout,
        }
    }
}

#[async_trait]
impl SourceAdapter for GoogleNewsAdapter {
    type Item = FeedItem;

    const SOURCE: Source = Source::GoogleNews;

    async fn fetch(&self, symbol: &Symbol) -> Result<Vec<FeedItem>, FetchError> {
        let q = format!("{symbol} stock");
        let req = self.http.get(&self.endpoint).query(&[
            ("q", q.as_str()),
            ("hl", "en-US"),
            ("gl", "US"),
            ("ceid", "US:en"),
        ]);
        let body = send_text(req, self.timeout).await?;
        let items = parse_feed(&body)?;
        tracing::debug!(source = "google_news", %symbol, count = items.len(), "parsed feed");
        Ok(items)
    }

    fn normalize(&self, symbol: &Symbol, item: FeedItem) -> SentimentRecord {
        SentimentRecord::builder(symbol, Self::SOURCE)
            .timestamp(item.pub_date.as_deref())
            .text("headline", item.title.as_deref())
            .field("url", item.link.unwrap_or_default())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keeps_headline_and_link_only() {
        let a = GoogleNewsAdapter {
            http: reqwest::Client::new(),
            endpoint: DEFAULT_URL.into(),
            timeout: Duration::from_secs(1),
        };
        let item = FeedItem {
            title: Some("Apple shares rise - Reuters".into()),
            link: Some("https://news.google.com/articles/x".into()),
            pub_date: Some("Tue, 02 Jan 2024 10:00:00 GMT".into()),
            description: Some("ignored".into()),
        };
        let rec = a.normalize(&Symbol::parse("AAPL").unwrap(), item);
        assert_eq!(rec.timestamp(), "2024-01-02T10:00:00Z");
        assert_eq!(rec.data_str("headline"), Some("Apple shares rise - Reuters"));
        assert!(rec.data_str("summary").is_none());
        assert_eq!(rec.data_str("platform"), Some("google_news"));
    }
}
