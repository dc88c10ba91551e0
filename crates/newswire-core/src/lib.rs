//! Feed scheduling and idempotent, entity-indexed article ingestion.
//!
//! The scheduler polls registered RSS feeds, hands due feeds to the
//! checker, which fetches fresh entries and ingests each article URL at
//! most once into a file-backed store indexed by canonical entity names.

pub mod article;
pub mod checker;
pub mod entity;
pub mod extract;
pub mod feed;
pub mod fetch;
pub mod normalize;
pub mod records;
pub mod registry;
pub mod scheduler;
pub mod search;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

pub use article::{Action, ArticleRecord, ArticleSummary};
pub use checker::{FeedChecker, FRESHNESS_WINDOW_HOURS};
pub use entity::{EntityKind, Mention, ParseEntityKindError};
pub use extract::{EntityExtractor, ExtractError, Lemmatizer, LexiconExtractor};
pub use feed::{FeedEntry, FeedParseError, FeedSource, HttpFeedSource, ParsedFeed};
pub use fetch::{ArticleFetcher, FetchError, FetchedArticle, HttpArticleFetcher};
pub use normalize::{AliasRule, EntityNormalizer};
pub use records::{write_atomic, JsonTable, RecordError};
pub use registry::{FeedRecord, FeedRegistry, FeedStatus, RegistryError};
pub use scheduler::Scheduler;
pub use search::SearchIndex;
pub use store::{ArticleStore, EntityIndexEntry, IngestError, IngestOutcome};
