// src/sources/finviz.rs
//! Finviz quote page news table.
//!
//! Rows carry either `Jan-02-24 10:00AM` or just `09:30AM`; a time-only row
//! belongs to the date of the nearest dated row above it. Times are taken as UTC.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::{AdapterContext, SourceAdapter};
use crate::error::FetchError;
use crate::http::send_text;
use crate::record::{format_timestamp, SentimentRecord, Source, Symbol};

const DEFAULT_URL: &str = "https://finviz.com/quote.ashx";
const SITE_ROOT: &str = "https://finviz.com";

static SEL_ROWS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.fullview-news-outer tr").expect("static selector"));
static SEL_TD: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("static selector"));
static SEL_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsRow {
    pub timestamp: String,
    pub headline: String,
    pub url: String,
}

pub struct FinvizAdapter {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl FinvizAdapter {
    pub fn from_context(ctx: &AdapterContext) -> Self {
        Self {
            http: ctx.http.clone(),
            endpoint: ctx.settings.endpoint_or(DEFAULT_URL),
            timeout: ctx.settings.request_timeout,
        }
    }
}

#[async_trait]
impl SourceAdapter for FinvizAdapter {
    type Item = NewsRow;

    const SOURCE: Source = Source::Finviz;

    async fn fetch(&self, symbol: &Symbol) -> Result<Vec<NewsRow>, FetchError> {
        let req = self.http.get(&self.endpoint).query(&[("t", symbol.as_str())]);
        let body = send_text(req, self.timeout).await?;
        let rows = parse_news_table(&body, Utc::now().date_naive());
        if rows.is_empty() {
            tracing::debug!(source = "finviz", %symbol, "no news table rows");
        }
        Ok(rows)
    }

    fn normalize(&self, symbol: &Symbol, row: NewsRow) -> SentimentRecord {
        SentimentRecord::builder(symbol, Self::SOURCE)
            .timestamp(Some(row.timestamp.as_str()))
            .text("headline", Some(row.headline.as_str()))
            .field("url", row.url)
            .build()
    }
}

/// Extract news rows. Rows without a link or with an unreadable stamp are skipped.
pub fn parse_news_table(html: &str, today: NaiveDate) -> Vec<NewsRow> {
    let doc = Html::parse_document(html);
    let mut current_date: Option<NaiveDate> = None;
    let mut out = Vec::new();

    for tr in doc.select(&SEL_ROWS) {
        let tds: Vec<ElementRef<'_>> = tr.select(&SEL_TD).collect();
        if tds.len() != 2 {
            continue;
        }
        let stamp = tds[0].text().collect::<String>();
        let Some(link) = tds[1].select(&SEL_LINK).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };

        let Some(at) = parse_stamp(stamp.trim(), &mut current_date, today) else {
            tracing::debug!(source = "finviz", stamp = stamp.trim(), "unreadable row stamp");
            continue;
        };

        out.push(NewsRow {
            timestamp: format_timestamp(at.and_utc()),
            headline: link.text().collect::<String>(),
            url: absolute_url(href),
        });
    }
    out
}

fn parse_stamp(
    raw: &str,
    current_date: &mut Option<NaiveDate>,
    today: NaiveDate,
) -> Option<NaiveDateTime> {
    let mut parts = raw.split_whitespace();
    let first = parts.next()?;
    match parts.next() {
        Some(time_part) => {
            let date = if first.eq_ignore_ascii_case("today") {
                today
            } else {
                NaiveDate::parse_from_str(first, "%b-%d-%y").ok()?
            };
            let time = NaiveTime::parse_from_str(time_part, "%I:%M%p").ok()?;
            *current_date = Some(date);
            Some(date.and_time(time))
        }
        None => {
            let time = NaiveTime::parse_from_str(first, "%I:%M%p").ok()?;
            Some(current_date.unwrap_or(today).and_time(time))
        }
    }
}

fn absolute_url(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{SITE_ROOT}{href}")
    } else {
        format!("{SITE_ROOT}/{href}")
    }
}
