//! Durable article storage with URL deduplication and an entity inverted
//! index.
//!
//! On-disk layout under the store's base directory:
//!
//! ```text
//! content/<id>.txt              article body with a small header
//! metadata/<id>.json            the ArticleRecord
//! metadata/url_index.json       url -> article id
//! metadata/entity_index.json    canonical key -> { kind, article ids }
//! ```
//!
//! The URL index is the single source of truth for "has this URL been
//! ingested". It is written last, after content, metadata, and the entity
//! index are durable, so a crash can orphan files but never index a missing
//! article. Orphans are simply never reachable and are ignored.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::article::{article_id, Action, ArticleRecord, ArticleSummary};
use crate::entity::EntityKind;
use crate::extract::{EntityExtractor, ExtractError};
use crate::fetch::{ArticleFetcher, FetchError};
use crate::normalize::EntityNormalizer;
use crate::records::{write_atomic, JsonTable, RecordError, RecordResult};

pub(crate) const CONTENT_DIR: &str = "content";
pub(crate) const METADATA_DIR: &str = "metadata";
pub(crate) const URL_INDEX_FILE: &str = "url_index.json";
pub(crate) const ENTITY_INDEX_FILE: &str = "entity_index.json";

const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("empty article body: {0}")]
    EmptyBody(String),
    #[error("entity extraction failed: {0}")]
    Extraction(#[from] ExtractError),
    #[error("store write failed: {0}")]
    Persist(#[from] RecordError),
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Result of an ingestion attempt. `AlreadyExists` is the idempotent no-op,
/// not an error.
#[derive(Debug)]
pub enum IngestOutcome {
    Ingested(ArticleRecord),
    AlreadyExists,
}

/// One row of the entity inverted index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityIndexEntry {
    /// Fixed at first observation; later conflicting kinds are ignored.
    pub kind: EntityKind,
    pub articles: BTreeSet<String>,
}

pub struct ArticleStore {
    base_dir: PathBuf,
    url_index: JsonTable<String>,
    entity_index: JsonTable<EntityIndexEntry>,
    normalizer: EntityNormalizer,
}

impl ArticleStore {
    /// Open (or create) a store rooted at `base_dir`.
    pub fn open(base_dir: impl Into<PathBuf>, normalizer: EntityNormalizer) -> RecordResult<Self> {
        let base_dir = base_dir.into();
        let metadata_dir = base_dir.join(METADATA_DIR);
        std::fs::create_dir_all(base_dir.join(CONTENT_DIR))?;
        std::fs::create_dir_all(&metadata_dir)?;

        Ok(Self {
            url_index: JsonTable::open(metadata_dir.join(URL_INDEX_FILE))?,
            entity_index: JsonTable::open(metadata_dir.join(ENTITY_INDEX_FILE))?,
            base_dir,
            normalizer,
        })
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[must_use]
    pub fn article_count(&self) -> usize {
        self.url_index.len()
    }

    /// Ingest one article URL. At most one record per URL, ever.
    ///
    /// The dedup check runs before any fetch or NLP work. Failures are
    /// all-or-nothing: no partial record or index entry survives an error.
    pub async fn ingest(
        &mut self,
        url: &str,
        fetcher: &dyn ArticleFetcher,
        extractor: &dyn EntityExtractor,
    ) -> IngestResult<IngestOutcome> {
        if self.url_index.contains(url) {
            debug!(url, "article already ingested");
            return Ok(IngestOutcome::AlreadyExists);
        }

        let fetched = fetcher.fetch(url).await?;
        if fetched.body.trim().is_empty() {
            return Err(IngestError::EmptyBody(url.to_string()));
        }

        let mentions = extractor.extract(&fetched.body).await?;

        let mut entities: BTreeMap<String, EntityKind> = BTreeMap::new();
        let mut actions = Vec::new();
        for mention in mentions {
            let key = self.normalizer.normalize(&mention.text, Some(mention.kind));
            if key.is_empty() {
                continue;
            }
            entities.entry(key.clone()).or_insert(mention.kind);
            if mention.kind == EntityKind::Person {
                if let Some(verb) = mention.subject_of {
                    actions.push(Action {
                        person: key,
                        verb: verb.to_lowercase(),
                    });
                }
            }
        }

        let now = Utc::now();
        let record = ArticleRecord {
            id: article_id(url, now),
            url: url.to_string(),
            title: fetched.title,
            published_at: fetched.published_at.unwrap_or(now),
            entities,
            actions,
        };

        // Durability order: content, metadata, entity index, URL index last.
        // Each index write rolls its memory image back on failure, so a
        // failed ingest never leaves a partial entry for a later ingest to
        // persist.
        self.write_content(&record, &fetched.body)?;
        self.write_metadata(&record)?;

        self.entity_index.commit(|entries| {
            for (key, kind) in &record.entities {
                entries
                    .entry(key.clone())
                    .or_insert_with(|| EntityIndexEntry {
                        kind: *kind,
                        articles: BTreeSet::new(),
                    })
                    .articles
                    .insert(record.id.clone());
            }
        })?;

        if let Err(e) = self.url_index.commit(|entries| {
            entries.insert(url.to_string(), record.id.clone());
        }) {
            // The URL never became visible, so the entity index must not
            // keep the id either; otherwise a retry of this URL would be
            // indexed twice.
            self.unindex_entities(&record);
            return Err(e.into());
        }

        debug!(url, id = %record.id, entities = record.entities.len(), "article ingested");
        Ok(IngestOutcome::Ingested(record))
    }

    /// Look up articles mentioning `term`.
    ///
    /// The term is normalized exactly like indexed mentions. When `kind` is
    /// given, a stored entry of a different kind yields no results. Order is
    /// unspecified.
    #[must_use]
    pub fn search(&self, term: &str, kind: Option<EntityKind>) -> Vec<ArticleSummary> {
        let key = self.normalizer.normalize(term, kind);
        let Some(entry) = self.entity_index.get(&key) else {
            return Vec::new();
        };
        if kind.is_some_and(|k| k != entry.kind) {
            return Vec::new();
        }
        entry
            .articles
            .iter()
            .filter_map(|id| read_summary(&self.base_dir, id))
            .collect()
    }

    /// Load a record by storage id.
    pub fn get(&self, id: &str) -> RecordResult<Option<ArticleRecord>> {
        read_record(&self.base_dir, id)
    }

    /// Load a record by its URL, through the URL index.
    pub fn get_by_url(&self, url: &str) -> RecordResult<Option<ArticleRecord>> {
        match self.url_index.get(url) {
            Some(id) => read_record(&self.base_dir, id),
            None => Ok(None),
        }
    }

    /// Remove `record.id` from every entity index row it was added to,
    /// dropping rows that become empty. Best effort on disk; even when the
    /// write fails the in-memory view no longer carries the id.
    fn unindex_entities(&mut self, record: &ArticleRecord) {
        for key in record.entities.keys() {
            let now_empty = self.entity_index.get_mut(key).is_some_and(|entry| {
                entry.articles.remove(&record.id);
                entry.articles.is_empty()
            });
            if now_empty {
                self.entity_index.remove(key);
            }
        }
        if let Err(e) = self.entity_index.persist() {
            warn!(id = %record.id, error = %e, "failed to undo entity index entries");
        }
    }

    fn write_content(&self, record: &ArticleRecord, body: &str) -> RecordResult<()> {
        let text = format!(
            "Title: {}\nURL: {}\nPublished: {}\n\n{}\n\n{}",
            record.title,
            record.url,
            record.published_at.to_rfc3339(),
            "=".repeat(50),
            body,
        );
        write_atomic(&content_path(&self.base_dir, &record.id), text.as_bytes())
    }

    fn write_metadata(&self, record: &ArticleRecord) -> RecordResult<()> {
        let bytes = serde_json::to_vec_pretty(record)?;
        write_atomic(&metadata_path(&self.base_dir, &record.id), &bytes)
    }
}

fn content_path(base_dir: &Path, id: &str) -> PathBuf {
    base_dir.join(CONTENT_DIR).join(format!("{id}.txt"))
}

fn metadata_path(base_dir: &Path, id: &str) -> PathBuf {
    base_dir.join(METADATA_DIR).join(format!("{id}.json"))
}

fn read_record(base_dir: &Path, id: &str) -> RecordResult<Option<ArticleRecord>> {
    let path = metadata_path(base_dir, id);
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path)?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Build a search summary for one article id. Articles with missing or
/// unreadable files are skipped with a warning; the index may briefly point
/// ahead of what a concurrent reader can see.
pub(crate) fn read_summary(base_dir: &Path, id: &str) -> Option<ArticleSummary> {
    let record = match read_record(base_dir, id) {
        Ok(Some(record)) => record,
        Ok(None) => {
            warn!(id, "metadata file missing for indexed article");
            return None;
        }
        Err(e) => {
            warn!(id, error = %e, "failed to read article metadata");
            return None;
        }
    };

    let preview = match std::fs::read_to_string(content_path(base_dir, id)) {
        Ok(content) => {
            let mut preview: String = content.chars().take(PREVIEW_CHARS).collect();
            if content.chars().count() > PREVIEW_CHARS {
                preview.push_str("...");
            }
            preview
        }
        Err(e) => {
            warn!(id, error = %e, "failed to read article content");
            return None;
        }
    };

    Some(ArticleSummary {
        title: record.title,
        published_at: record.published_at,
        url: record.url,
        preview,
    })
}
