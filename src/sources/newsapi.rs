// src/sources/newsapi.rs
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{AdapterContext, SourceAdapter};
use crate::config::keys;
use crate::error::{ConfigError, FetchError};
use crate::http::send_json;
use crate::record::{SentimentRecord, Source, Symbol};

const DEFAULT_URL: &str = "https://newsapi.org/v2/everything";
const DEFAULT_QUERY: &str = "stocks OR earnings OR finance";
const PAGE_SIZE: &str = "10";

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Article {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    pub source: Option<ArticleSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArticleSource {
    pub name: Option<String>,
}

/// `everything` search, newest first, ten articles per symbol.
pub struct NewsApiAdapter {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    query: String,
    timeout: Duration,
}

impl NewsApiAdapter {
    pub fn from_context(ctx: &AdapterContext) -> Result<Self, ConfigError> {
        Ok(Self {
            http: ctx.http.clone(),
            endpoint: ctx.settings.endpoint_or(DEFAULT_URL),
            api_key: ctx.config.require_non_empty(keys::NEWSAPI_KEY)?,
            query: ctx.config.resolve_or(keys::NEWSAPI_QUERY, DEFAULT_QUERY),
            timeout: ctx.settings.request_timeout,
        })
    }
}

#[async_trait]
impl SourceAdapter for NewsApiAdapter {
    type Item = Article;

    const SOURCE: Source = Source::NewsApi;

    async fn fetch(&self, symbol: &Symbol) -> Result<Vec<Article>, FetchError> {
        tracing::debug!(source = "newsapi", %symbol, "querying");
        let q = format!("{symbol} {}", self.query);
        let req = self.http.get(&self.endpoint).query(&[
            ("q", q.as_str()),
            ("sortBy", "publishedAt"),
            ("language", "en"),
            ("pageSize", PAGE_SIZE),
            ("apiKey", self.api_key.as_str()),
        ]);
        let resp: Response = send_json(req, self.timeout).await?;
        if resp.status.as_deref() == Some("error") {
            return Err(FetchError::permanent(format!(
                "newsapi error: {}",
                resp.message.unwrap_or_default()
            )));
        }
        Ok(resp.articles)
    }

    fn normalize(&self, symbol: &Symbol, article: Article) -> SentimentRecord {
        SentimentRecord::builder(symbol, Self::SOURCE)
            .timestamp(article.published_at.as_deref())
            .text("headline", article.title.as_deref())
            .text("summary", article.description.as_deref())
            .field("url", article.url.unwrap_or_default())
            .text(
                "source_name",
                article.source.as_ref().and_then(|s| s.name.as_deref()),
            )
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> NewsApiAdapter {
        NewsApiAdapter {
            http: reqwest::Client::new(),
            endpoint: DEFAULT_URL.into(),
            api_key: "k".into(),
            query: DEFAULT_QUERY.into(),
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn normalize_maps_article_fields() {
        let a: Article = serde_json::from_str(
            r#"{"title":"Apple beats","description":"<p>EPS up</p>","url":"https://n.test/a",
                "publishedAt":"2024-01-02T10:00:00Z","source":{"name":"Reuters"}}"#,
        )
        .unwrap();
        let rec = adapter().normalize(&Symbol::parse("AAPL").unwrap(), a);
        assert_eq!(rec.source(), Source::NewsApi);
        assert_eq!(rec.timestamp(), "2024-01-02T10:00:00Z");
        assert_eq!(rec.data_str("headline"), Some("Apple beats"));
        assert_eq!(rec.data_str("summary"), Some("EPS up"));
        assert_eq!(rec.data_str("source_name"), Some("Reuters"));
        assert_eq!(rec.data_str("platform"), Some("newsapi"));
    }

    #[test]
    fn normalize_survives_nulls() {
        let a: Article =
            serde_json::from_str(r#"{"title":null,"source":null,"publishedAt":null}"#).unwrap();
        let rec = adapter().normalize(&Symbol::parse("AAPL").unwrap(), a);
        assert_eq!(rec.data_str("headline"), Some(""));
        assert_eq!(rec.data_str("url"), Some(""));
        assert!(!rec.timestamp().is_empty());
    }
}
