// src/sources/stocktwits.rs
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{AdapterContext, SourceAdapter};
use crate::error::FetchError;
use crate::http::send_json;
use crate::record::{SentimentRecord, Source, Symbol};

const DEFAULT_URL: &str = "https://api.stocktwits.com/api/2/streams/symbol";

#[derive(Debug, Deserialize)]
struct Stream {
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Message {
    pub body: Option<String>,
    pub created_at: Option<String>,
    pub user: Option<User>,
    pub entities: Option<Entities>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct User {
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Entities {
    pub sentiment: Option<Sentiment>,
}

/// Author-tagged `Bullish` / `Bearish`, when present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Sentiment {
    pub basic: Option<String>,
}

/// Public symbol stream; no key needed.
pub struct StocktwitsAdapter {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl StocktwitsAdapter {
    pub fn from_context(ctx: &AdapterContext) -> Self {
        Self {
            http: ctx.http.clone(),
            endpoint: ctx.settings.endpoint_or(DEFAULT_URL),
            timeout: ctx.settings.request_timeout,
        }
    }
}

#[async_trait]
impl SourceAdapter for StocktwitsAdapter {
    type Item = Message;

    const SOURCE: Source = Source::Stocktwits;

    async fn fetch(&self, symbol: &Symbol) -> Result<Vec<Message>, FetchError> {
        let url = format!("{}/{}.json", self.endpoint, urlencoding::encode(symbol.as_str()));
        let stream: Stream = send_json(self.http.get(url), self.timeout).await?;
        tracing::debug!(source = "stocktwits", %symbol, count = stream.messages.len(), "fetched messages");
        Ok(stream.messages)
    }

    fn normalize(&self, symbol: &Symbol, msg: Message) -> SentimentRecord {
        let sentiment = msg
            .entities
            .and_then(|e| e.sentiment)
            .and_then(|s| s.basic)
            .unwrap_or_default();
        SentimentRecord::builder(symbol, Self::SOURCE)
            .timestamp(msg.created_at.as_deref())
            .field(
                "username",
                msg.user.and_then(|u| u.username).unwrap_or_default(),
            )
            .text("content", msg.body.as_deref())
            .field("sentiment", sentiment)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_reads_nested_user_and_sentiment() {
        let m: Message = serde_json::from_str(
            r#"{"body":"$TSLA to the moon","created_at":"2024-01-02T15:04:05Z",
                "user":{"username":"trader1"},"entities":{"sentiment":{"basic":"Bullish"}}}"#,
        )
        .unwrap();
        let a = StocktwitsAdapter {
            http: reqwest::Client::new(),
            endpoint: DEFAULT_URL.into(),
            timeout: Duration::from_secs(1),
        };
        let rec = a.normalize(&Symbol::parse("tsla").unwrap(), m);
        assert_eq!(rec.symbol().as_str(), "TSLA");
        assert_eq!(rec.data_str("username"), Some("trader1"));
        assert_eq!(rec.data_str("sentiment"), Some("Bullish"));
        assert_eq!(rec.data_str("platform"), Some("stocktwits"));
        assert_eq!(rec.timestamp(), "2024-01-02T15:04:05Z");
    }

    #[test]
    fn missing_entities_yield_empty_sentiment() {
        let a = StocktwitsAdapter {
            http: reqwest::Client::new(),
            endpoint: DEFAULT_URL.into(),
            timeout: Duration::from_secs(1),
        };
        let rec = a.normalize(&Symbol::parse("X").unwrap(), Message::default());
        assert_eq!(rec.data_str("sentiment"), Some(""));
        assert_eq!(rec.data_str("content"), Some(""));
    }
}
