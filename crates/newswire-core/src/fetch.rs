//! Article fetching boundary.

use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use thiserror::Error;

const USER_AGENT: &str = concat!("newswire/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid article url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Raw material for one article.
#[derive(Debug, Clone)]
pub struct FetchedArticle {
    pub title: String,
    /// Publish timestamp when the source exposes one.
    pub published_at: Option<DateTime<Utc>>,
    pub body: String,
}

/// Retrieves title, publish timestamp, and body text for a URL.
///
/// The production extractor is a third-party article-extraction service;
/// treated as an opaque capability here.
#[async_trait::async_trait]
pub trait ArticleFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedArticle>;
}

/// Plain HTTP fetcher with a crude HTML-to-text pass.
pub struct HttpArticleFetcher {
    client: reqwest::Client,
    strip: HtmlStripper,
}

impl HttpArticleFetcher {
    pub fn new() -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            strip: HtmlStripper::new(),
        })
    }
}

#[async_trait::async_trait]
impl ArticleFetcher for HttpArticleFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedArticle> {
        url::Url::parse(url)?;

        let html = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(FetchedArticle {
            title: self.strip.title(&html).unwrap_or_default(),
            published_at: None,
            body: self.strip.body_text(&html),
        })
    }
}

struct HtmlStripper {
    title: Regex,
    script_style: Regex,
    tag: Regex,
    whitespace: Regex,
}

impl HtmlStripper {
    fn new() -> Self {
        Self {
            title: Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("static regex"),
            script_style: Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>")
                .expect("static regex"),
            tag: Regex::new(r"(?s)<[^>]*>").expect("static regex"),
            whitespace: Regex::new(r"\s+").expect("static regex"),
        }
    }

    fn title(&self, html: &str) -> Option<String> {
        self.title
            .captures(html)
            .map(|c| decode_entities(c[1].trim()))
    }

    fn body_text(&self, html: &str) -> String {
        let without_blocks = self.script_style.replace_all(html, " ");
        let without_tags = self.tag.replace_all(&without_blocks, " ");
        let decoded = decode_entities(&without_tags);
        self.whitespace.replace_all(decoded.trim(), " ").into_owned()
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}
