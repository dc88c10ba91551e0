//! Read path over the entity inverted index.
//!
//! [`SearchIndex`] opens the on-disk index independently of ingestion, so a
//! query can run while the scheduler writes. Each search reads a
//! point-in-time snapshot; it may trail the latest ingest by one write,
//! which is the documented single-writer contract.

use std::path::{Path, PathBuf};

use crate::article::ArticleSummary;
use crate::entity::EntityKind;
use crate::normalize::EntityNormalizer;
use crate::records::{JsonTable, RecordResult};
use crate::store::{read_summary, EntityIndexEntry, ENTITY_INDEX_FILE, METADATA_DIR};

pub struct SearchIndex {
    base_dir: PathBuf,
    normalizer: EntityNormalizer,
}

impl SearchIndex {
    /// A read-only view over the store rooted at `base_dir`. Never creates
    /// or mutates files.
    #[must_use]
    pub fn open(base_dir: impl Into<PathBuf>, normalizer: EntityNormalizer) -> Self {
        Self {
            base_dir: base_dir.into(),
            normalizer,
        }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Normalize `term` and look it up in the entity index.
    ///
    /// A supplied `kind` must match the indexed kind, otherwise the result
    /// is empty. Result order is unspecified.
    pub fn search(
        &self,
        term: &str,
        kind: Option<EntityKind>,
    ) -> RecordResult<Vec<ArticleSummary>> {
        let key = self.normalizer.normalize(term, kind);
        let index: JsonTable<EntityIndexEntry> =
            JsonTable::snapshot(self.base_dir.join(METADATA_DIR).join(ENTITY_INDEX_FILE))?;

        let Some(entry) = index.get(&key) else {
            return Ok(Vec::new());
        };
        if kind.is_some_and(|k| k != entry.kind) {
            return Ok(Vec::new());
        }
        Ok(entry
            .articles
            .iter()
            .filter_map(|id| read_summary(&self.base_dir, id))
            .collect())
    }
}
