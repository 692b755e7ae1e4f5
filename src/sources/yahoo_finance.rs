// src/sources/yahoo_finance.rs
use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use super::{AdapterContext, SourceAdapter};
use crate::error::FetchError;
use crate::http::send_text;
use crate::record::{normalize_text, SentimentRecord, Source, Symbol};

const DEFAULT_URL: &str = "https://finance.yahoo.com/quote";
const SITE_ROOT: &str = "https://finance.yahoo.com";

static SEL_NEWS_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href^="/news/"]"#).expect("static selector"));

/// A headline link; the page carries no per-item timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headline {
    pub headline: String,
    pub url: String,
}

pub struct YahooFinanceAdapter {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl YahooFinanceAdapter {
    pub fn from_context(ctx: &AdapterContext) -> Self {
        Self {
            http: ctx.http.clone(),
            endpoint: ctx.settings.endpoint_or(DEFAULT_URL),
            timeout: ctx.settings.request_timeout,
        }
    }
}

#[async_trait]
impl SourceAdapter for YahooFinanceAdapter {
    type Item = Headline;

    const SOURCE: Source = Source::YahooFinance;

    async fn fetch(&self, symbol: &Symbol) -> Result<Vec<Headline>, FetchError> {
        let url = format!("{}/{}", self.endpoint, urlencoding::encode(symbol.as_str()));
        let req = self.http.get(url).query(&[("p", symbol.as_str())]);
        let body = send_text(req, self.timeout).await?;
        let links = extract_news_links(&body);
        tracing::debug!(source = "yahoo_finance", %symbol, count = links.len(), "scraped headlines");
        Ok(links)
    }

    fn normalize(&self, symbol: &Symbol, item: Headline) -> SentimentRecord {
        SentimentRecord::builder(symbol, Self::SOURCE)
            .timestamp(None)
            .field("headline", item.headline)
            .field("url", item.url)
            .build()
    }
}

/// `/news/...` anchors in page order, first occurrence of each URL wins.
/// Anchors without visible text are skipped.
pub fn extract_news_links(html: &str) -> Vec<Headline> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for a in doc.select(&SEL_NEWS_LINK) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let headline = normalize_text(&a.text().collect::<String>());
        if headline.is_empty() {
            continue;
        }
        let url = format!("{SITE_ROOT}{href}");
        if seen.insert(url.clone()) {
            out.push(Headline { headline, url });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_news_anchors_once_in_order() {
        let html = r#"<html><body>
<a href="/news/apple-beats-123.html"><h3>Apple beats</h3></a>
<a href="/quote/AAPL/options">Options</a>
<a href="/news/apple-beats-123.html">Apple beats</a>
<a href="/news/empty.html"><img src="x.png"></a>
<a href="/news/supplier-456.html">Supplier &amp; partner</a>
</body></html>"#;
        let links = extract_news_links(html);
        assert_eq!(
            links,
            vec![
                Headline {
                    headline: "Apple beats".into(),
                    url: "https://finance.yahoo.com/news/apple-beats-123.html".into(),
                },
                Headline {
                    headline: "Supplier & partner".into(),
                    url: "https://finance.yahoo.com/news/supplier-456.html".into(),
                },
            ]
        );
    }
}
