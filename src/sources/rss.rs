// src/sources/rss.rs
//! Minimal RSS 2.0 reader shared by the feed-based adapters.

use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::FetchError;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<FeedItem>,
}

/// One `<item>`; every field is optional upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    #[serde(rename = "pubDate")]
    pub pub_date: Option<String>,
    pub description: Option<String>,
}

/// Parse a feed body. A body that is not RSS is a permanent failure.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>, FetchError> {
    let cleaned = scrub_html_entities_for_xml(xml);
    let rss: Rss =
        from_str(&cleaned).map_err(|e| FetchError::permanent(format!("invalid RSS: {e}")))?;
    Ok(rss.channel.item)
}

/// HTML entities that feeds leak into XML and that an XML parser rejects.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
