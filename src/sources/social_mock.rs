// src/sources/social_mock.rs
//! Offline stand-in for a social feed: one canned post per symbol.

use async_trait::async_trait;

use super::SourceAdapter;
use crate::error::FetchError;
use crate::record::{SentimentRecord, Source, Symbol};

const USERNAME: &str = "wallstreetbets_user123";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub username: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SocialMockAdapter;

#[async_trait]
impl SourceAdapter for SocialMockAdapter {
    type Item = Post;

    const SOURCE: Source = Source::Reddit;

    async fn fetch(&self, symbol: &Symbol) -> Result<Vec<Post>, FetchError> {
        Ok(vec![Post {
            username: USERNAME.to_string(),
            content: format!("{symbol} is going to the moon \u{1F680}\u{1F680}\u{1F680}"),
        }])
    }

    fn normalize(&self, symbol: &Symbol, post: Post) -> SentimentRecord {
        SentimentRecord::builder(symbol, Self::SOURCE)
            .timestamp(None)
            .field("username", post.username)
            .field("content", post.content)
            .build()
    }
}
