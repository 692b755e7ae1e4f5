// src/sources/youtube.rs
//! Recent videos per symbol from the YouTube Data API, each paired with its
//! English caption track. Videos without captions are dropped.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{AdapterContext, SourceAdapter};
use crate::config::keys;
use crate::error::{ConfigError, FetchError};
use crate::http::{send_json, send_text};
use crate::record::{normalize_text, SentimentRecord, Source, Symbol};

const DEFAULT_URL: &str = "https://www.googleapis.com/youtube/v3/search";
const DEFAULT_TRANSCRIPT_URL: &str = "https://video.google.com/timedtext";
const SEARCH_TERMS: &str = "finance|stock|market|earnings";
const MAX_VIDEOS: usize = 5;
const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchItem {
    id: VideoId,
    snippet: Snippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VideoId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Snippet {
    title: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Transcript {
    #[serde(rename = "text", default)]
    lines: Vec<CaptionLine>,
}

#[derive(Debug, Deserialize)]
struct CaptionLine {
    #[serde(rename = "$text", default)]
    text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Video {
    pub video_id: String,
    pub title: Option<String>,
    pub published_at: Option<String>,
    pub transcript: String,
}

pub struct YouTubeAdapter {
    http: reqwest::Client,
    endpoint: String,
    transcript_endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl YouTubeAdapter {
    pub fn from_context(ctx: &AdapterContext) -> Result<Self, ConfigError> {
        let transcript_endpoint = ctx
            .config
            .resolve_or(keys::YOUTUBE_TRANSCRIPT_URL, DEFAULT_TRANSCRIPT_URL)
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            http: ctx.http.clone(),
            endpoint: ctx.settings.endpoint_or(DEFAULT_URL),
            transcript_endpoint,
            api_key: ctx.config.require_non_empty(keys::YOUTUBE_API_KEY)?,
            timeout: ctx.settings.request_timeout,
        })
    }

    async fn search(&self, symbol: &Symbol) -> Result<Vec<SearchItem>, FetchError> {
        let q = format!("{symbol} {SEARCH_TERMS}");
        let max_results = MAX_VIDEOS.to_string();
        let req = self.http.get(&self.endpoint).query(&[
            ("part", "snippet"),
            ("type", "video"),
            ("order", "date"),
            ("maxResults", max_results.as_str()),
            ("q", q.as_str()),
            ("key", self.api_key.as_str()),
        ]);
        let resp: SearchResponse = send_json(req, self.timeout).await?;
        Ok(resp.items)
    }

    /// `Ok(None)` when the video has no English captions.
    async fn transcript(&self, video_id: &str) -> Result<Option<String>, FetchError> {
        let req = self
            .http
            .get(&self.transcript_endpoint)
            .query(&[("lang", "en"), ("v", video_id)]);
        let body = send_text(req, self.timeout).await?;
        Ok(parse_transcript(&body))
    }
}

/// Join a timedtext document into one line of text. Empty or unparseable
/// documents mean no caption track.
fn parse_transcript(xml: &str) -> Option<String> {
    if xml.trim().is_empty() {
        return None;
    }
    let doc: Transcript = quick_xml::de::from_str(xml).ok()?;
    let joined = doc
        .lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let text = normalize_text(&joined);
    (!text.is_empty()).then_some(text)
}

#[async_trait]
impl SourceAdapter for YouTubeAdapter {
    type Item = Video;

    const SOURCE: Source = Source::YouTube;

    // one search plus a caption request per video
    const REQUESTS_PER_FETCH: u32 = 1 + MAX_VIDEOS as u32;

    async fn fetch(&self, symbol: &Symbol) -> Result<Vec<Video>, FetchError> {
        let found = self.search(symbol).await?;
        let mut videos = Vec::with_capacity(found.len());

        for item in found.into_iter().take(MAX_VIDEOS) {
            let Some(video_id) = item.id.video_id.filter(|id| !id.is_empty()) else {
                continue;
            };
            match self.transcript(&video_id).await {
                Ok(Some(transcript)) => videos.push(Video {
                    video_id,
                    title: item.snippet.title,
                    published_at: item.snippet.published_at,
                    transcript,
                }),
                Ok(None) => {
                    tracing::debug!(source = "youtube", %symbol, video_id = %video_id, "no captions; skipped");
                }
                Err(e) => {
                    tracing::warn!(source = "youtube", %symbol, video_id = %video_id, error = %e, "caption fetch failed; skipped");
                }
            }
        }
        Ok(videos)
    }

    fn normalize(&self, symbol: &Symbol, video: Video) -> SentimentRecord {
        SentimentRecord::builder(symbol, Self::SOURCE)
            .timestamp(video.published_at.as_deref())
            .text("headline", video.title.as_deref())
            .field("url", format!("{WATCH_URL}{}", video.video_id))
            .field("transcript", video.transcript)
            .build()
    }
}
