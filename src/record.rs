// src/record.rs
//! The wire payload every adapter produces and every transport emits.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Upper-cased, trimmed, non-empty ticker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let t = raw.trim();
        if t.is_empty() {
            None
        } else {
            Some(Self(t.to_uppercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Closed set of origins. The serialized form is the `source` label on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "NewsAPI")]
    NewsApi,
    Finviz,
    GoogleNews,
    SeekingAlpha,
    Stocktwits,
    YahooFinance,
    #[serde(rename = "YouTube")]
    YouTube,
    Benzinga,
    Reddit,
}

impl Source {
    pub const ALL: [Source; 9] = [
        Source::NewsApi,
        Source::Finviz,
        Source::GoogleNews,
        Source::SeekingAlpha,
        Source::Stocktwits,
        Source::YahooFinance,
        Source::YouTube,
        Source::Benzinga,
        Source::Reddit,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Source::NewsApi => "NewsAPI",
            Source::Finviz => "Finviz",
            Source::GoogleNews => "GoogleNews",
            Source::SeekingAlpha => "SeekingAlpha",
            Source::Stocktwits => "Stocktwits",
            Source::YahooFinance => "YahooFinance",
            Source::YouTube => "YouTube",
            Source::Benzinga => "Benzinga",
            Source::Reddit => "Reddit",
        }
    }

    /// Lower-case token written to `data.platform`.
    pub const fn platform(self) -> &'static str {
        match self {
            Source::NewsApi => "newsapi",
            Source::Finviz => "finviz",
            Source::GoogleNews => "google_news",
            Source::SeekingAlpha => "seeking_alpha",
            Source::Stocktwits => "stocktwits",
            Source::YahooFinance => "yahoo_finance",
            Source::YouTube => "youtube",
            Source::Benzinga => "benzinga",
            Source::Reddit => "reddit",
        }
    }

    /// Prefix for per-source keys such as `NEWSAPI_FILL_RATE`.
    pub const fn config_prefix(self) -> &'static str {
        match self {
            Source::NewsApi => "NEWSAPI",
            Source::Finviz => "FINVIZ",
            Source::GoogleNews => "GOOGLE_NEWS",
            Source::SeekingAlpha => "SEEKING_ALPHA",
            Source::Stocktwits => "STOCKTWITS",
            Source::YahooFinance => "YAHOO_FINANCE",
            Source::YouTube => "YOUTUBE",
            Source::Benzinga => "BENZINGA",
            Source::Reddit => "REDDIT",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSource(pub String);

impl fmt::Display for UnknownSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown source: {}", self.0)
    }
}

impl std::error::Error for UnknownSource {}

impl FromStr for Source {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        // Dispatcher aliases kept from the old poller-type flag.
        match t.to_ascii_lowercase().as_str() {
            "news" => return Ok(Source::NewsApi),
            "social" | "reddit-mock" | "reddit_mock" => return Ok(Source::Reddit),
            _ => {}
        }
        Source::ALL
            .into_iter()
            .find(|src| {
                src.platform().eq_ignore_ascii_case(t)
                    || src.label().eq_ignore_ascii_case(t)
                    || src.config_prefix().eq_ignore_ascii_case(t)
            })
            .ok_or_else(|| UnknownSource(t.to_string()))
    }
}

/// Normalized, immutable record handed to the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecord {
    symbol: Symbol,
    timestamp: String,
    source: Source,
    data: Map<String, Value>,
}

impl SentimentRecord {
    pub fn builder(symbol: &Symbol, source: Source) -> RecordBuilder {
        RecordBuilder {
            symbol: symbol.clone(),
            source,
            timestamp: None,
            data: Map::new(),
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// String view of a `data` key; `None` when absent or not a string.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

pub struct RecordBuilder {
    symbol: Symbol,
    source: Source,
    timestamp: Option<String>,
    data: Map<String, Value>,
}

impl RecordBuilder {
    /// Raw upstream timestamp; unparseable or absent values become "now" at build time.
    pub fn timestamp(mut self, raw: Option<&str>) -> Self {
        self.timestamp = raw.map(str::to_string);
        self
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    /// Cleaned text field; absent input becomes an empty string.
    pub fn text(self, key: &str, raw: Option<&str>) -> Self {
        let v = raw.map(normalize_text).unwrap_or_default();
        self.field(key, v)
    }

    pub fn build(mut self) -> SentimentRecord {
        self.data.insert(
            "platform".to_string(),
            Value::String(self.source.platform().to_string()),
        );
        SentimentRecord {
            timestamp: normalize_timestamp(self.timestamp.as_deref()),
            symbol: self.symbol,
            source: self.source,
            data: self.data,
        }
    }
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse the timestamp shapes upstream sources emit. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// RFC 3339 UTC string for `raw`, or for the current instant when `raw` is unusable.
pub fn normalize_timestamp(raw: Option<&str>) -> String {
    raw.and_then(parse_timestamp)
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("static regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

const MAX_TEXT_CHARS: usize = 1500;

/// Normalize upstream text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    out = RE_TAGS.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    out = RE_WS.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }

    out
}
