//! Feed source boundary.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

const USER_AGENT: &str = concat!("newswire/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FeedParseError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed feed: {0}")]
    Malformed(String),
}

pub type FeedParseResult<T> = Result<T, FeedParseError>;

/// One entry of a parsed feed. Both fields are optional in the wild.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub link: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub entries: Vec<FeedEntry>,
}

/// Fetches and parses one feed URL.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn parse(&self, url: &str) -> FeedParseResult<ParsedFeed>;
}

/// HTTP feed source backed by `feed-rs`.
pub struct HttpFeedSource {
    client: reqwest::Client,
}

impl HttpFeedSource {
    pub fn new() -> FeedParseResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl FeedSource for HttpFeedSource {
    async fn parse(&self, url: &str) -> FeedParseResult<ParsedFeed> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let feed = feed_rs::parser::parse(bytes.as_ref())
            .map_err(|e| FeedParseError::Malformed(e.to_string()))?;

        let entries = feed
            .entries
            .into_iter()
            .map(|entry| FeedEntry {
                link: entry.links.first().map(|l| l.href.clone()),
                published_at: entry.published.map(|dt| dt.with_timezone(&Utc)),
            })
            .collect();

        Ok(ParsedFeed {
            title: feed.title.map(|t| t.content),
            description: feed.description.map(|d| d.content),
            entries,
        })
    }
}
