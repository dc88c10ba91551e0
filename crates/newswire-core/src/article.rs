use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;

/// An action attributed to a person found as the grammatical subject of a
/// verb: `(canonical person key, verb lemma)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub person: String,
    pub verb: String,
}

/// One ingested article. Created atomically, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: String,
    pub url: String,
    pub title: String,
    /// Source publish time, or ingestion time when the source had none.
    pub published_at: DateTime<Utc>,
    /// Canonical entity key to kind, deduplicated per article. The kind is
    /// fixed at the first mention within the article.
    pub entities: BTreeMap<String, EntityKind>,
    /// Ordered person-verb attributions.
    pub actions: Vec<Action>,
}

/// Search result row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub url: String,
    pub preview: String,
}

/// Storage key for an article: ingestion timestamp plus a short URL hash.
///
/// Deterministic in its inputs; collisions would need the same URL hashed in
/// the same second, which ingestion dedup already rules out.
#[must_use]
pub fn article_id(url: &str, ingested_at: DateTime<Utc>) -> String {
    format!("{}_{}", ingested_at.format("%Y%m%d_%H%M%S"), url_hash(url))
}

fn url_hash(url: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
