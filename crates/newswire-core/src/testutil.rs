//! Shared fixtures for the crate's tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entity::{EntityKind, Mention};
use crate::extract::{EntityExtractor, ExtractResult, Lemmatizer, LexiconExtractor};
use crate::feed::{FeedEntry, FeedParseError, FeedParseResult, FeedSource, ParsedFeed};
use crate::fetch::{ArticleFetcher, FetchError, FetchResult, FetchedArticle};

/// Lexicon extractor covering the fixture texts used across the tests.
pub fn test_lexicon() -> LexiconExtractor {
    LexiconExtractor::with_default_lexicon()
        .with_surname("иванов")
        .with_lemma("иванова", "иванов")
}

/// Fetcher that always succeeds with a fixed title and body.
pub struct StaticFetcher {
    title: String,
    body: String,
    published_at: Option<DateTime<Utc>>,
}

impl StaticFetcher {
    pub fn new(title: &str, body: &str) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            published_at: None,
        }
    }

    pub fn with_published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }
}

#[async_trait]
impl ArticleFetcher for StaticFetcher {
    async fn fetch(&self, _url: &str) -> FetchResult<FetchedArticle> {
        Ok(FetchedArticle {
            title: self.title.clone(),
            published_at: self.published_at,
            body: self.body.clone(),
        })
    }
}

/// Fetcher that always fails with a URL parse error.
pub struct FailingFetcher;

#[async_trait]
impl ArticleFetcher for FailingFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedArticle> {
        Err(FetchError::InvalidUrl(
            url::Url::parse(&format!("::broken::{url}")).unwrap_err(),
        ))
    }
}

/// Extractor that returns the same mentions for any input text.
pub struct StaticExtractor {
    mentions: Vec<Mention>,
}

impl StaticExtractor {
    pub fn new(mentions: Vec<Mention>) -> Self {
        Self { mentions }
    }

    pub fn location(text: &str) -> Self {
        Self::new(vec![Mention::new(text, EntityKind::Location)])
    }

    pub fn organization(text: &str) -> Self {
        Self::new(vec![Mention::new(text, EntityKind::Organization)])
    }
}

impl Lemmatizer for StaticExtractor {
    fn lemmas(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_lowercase).collect()
    }
}

#[async_trait]
impl EntityExtractor for StaticExtractor {
    async fn extract(&self, _text: &str) -> ExtractResult<Vec<Mention>> {
        Ok(self.mentions.clone())
    }
}

/// Feed source that serves a fixed parse result.
pub struct StaticFeedSource {
    title: Option<String>,
    description: Option<String>,
    entries: Vec<FeedEntry>,
}

impl StaticFeedSource {
    pub fn new(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            description: None,
            entries: Vec::new(),
        }
    }

    pub fn with_entry(mut self, link: Option<&str>, published_at: Option<DateTime<Utc>>) -> Self {
        self.entries.push(FeedEntry {
            link: link.map(str::to_string),
            published_at,
        });
        self
    }
}

#[async_trait]
impl FeedSource for StaticFeedSource {
    async fn parse(&self, _url: &str) -> FeedParseResult<ParsedFeed> {
        Ok(ParsedFeed {
            title: self.title.clone(),
            description: self.description.clone(),
            entries: self.entries.clone(),
        })
    }
}

/// Feed source that always reports a malformed feed.
pub struct FailingFeedSource;

#[async_trait]
impl FeedSource for FailingFeedSource {
    async fn parse(&self, url: &str) -> FeedParseResult<ParsedFeed> {
        Err(FeedParseError::Malformed(format!("unreachable: {url}")))
    }
}
