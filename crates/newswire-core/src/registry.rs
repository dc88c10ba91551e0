//! Durable per-feed schedule state.
//!
//! The whole registry is one human-inspectable JSON file, rewritten
//! atomically on every mutation. A failed write rolls the in-memory state
//! back, so memory and disk never diverge.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::feed::{FeedParseError, FeedSource};
use crate::records::{write_atomic, RecordError};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("feed validation failed for {url}: {source}")]
    Validation {
        url: String,
        source: FeedParseError,
    },
    #[error("unknown feed: {0}")]
    UnknownFeed(String),
    #[error("registry write failed: {0}")]
    Persist(#[from] RecordError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Derived, non-persisted schedule health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Active,
    Paused,
    /// More than two intervals have passed since the last completed check.
    Delayed,
}

impl std::fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Paused => f.write_str("paused"),
            Self::Delayed => f.write_str("delayed"),
        }
    }
}

/// One monitored feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    pub interval_minutes: u32,
    /// Monotonically non-decreasing; advanced only after a completed check.
    pub last_check: DateTime<Utc>,
    pub active: bool,
}

impl FeedRecord {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::minutes(i64::from(self.interval_minutes))
    }

    /// Active and overdue for a check.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.active && now - self.last_check >= self.interval()
    }

    #[must_use]
    pub fn status(&self, now: DateTime<Utc>) -> FeedStatus {
        if !self.active {
            FeedStatus::Paused
        } else if now - self.last_check > self.interval() * 2 {
            FeedStatus::Delayed
        } else {
            FeedStatus::Active
        }
    }
}

pub struct FeedRegistry {
    path: PathBuf,
    feeds: BTreeMap<String, FeedRecord>,
}

impl FeedRegistry {
    /// Open the registry file, or start empty when none exists.
    pub fn open(path: impl Into<PathBuf>) -> RegistryResult<Self> {
        let path = path.into();
        let feeds = if path.exists() {
            let bytes = std::fs::read(&path).map_err(RecordError::from)?;
            serde_json::from_slice(&bytes).map_err(RecordError::from)?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, feeds })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn get(&self, url: &str) -> Option<&FeedRecord> {
        self.feeds.get(url)
    }

    /// All feeds, ordered by URL.
    #[must_use]
    pub fn list(&self) -> Vec<FeedRecord> {
        self.feeds.values().cloned().collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    /// Register a feed, validating the URL against the source once.
    ///
    /// `last_check` starts one interval in the past so the feed is eligible
    /// on the next scheduling pass. Re-registering an existing URL replaces
    /// its record.
    pub async fn register(
        &mut self,
        url: &str,
        interval_minutes: u32,
        source: &dyn FeedSource,
    ) -> RegistryResult<FeedRecord> {
        let parsed = source
            .parse(url)
            .await
            .map_err(|source| RegistryError::Validation {
                url: url.to_string(),
                source,
            })?;

        let interval_minutes = interval_minutes.max(1);
        let record = FeedRecord {
            url: url.to_string(),
            title: parsed.title.unwrap_or_else(|| "Unknown".to_string()),
            description: parsed.description.unwrap_or_default(),
            interval_minutes,
            last_check: Utc::now() - Duration::minutes(i64::from(interval_minutes)),
            active: true,
        };

        self.commit(|feeds| {
            feeds.insert(record.url.clone(), record.clone());
        })?;
        info!(url, interval_minutes, "feed registered");
        Ok(record)
    }

    pub fn deregister(&mut self, url: &str) -> RegistryResult<()> {
        if !self.feeds.contains_key(url) {
            return Err(RegistryError::UnknownFeed(url.to_string()));
        }
        self.commit(|feeds| {
            feeds.remove(url);
        })?;
        info!(url, "feed deregistered");
        Ok(())
    }

    pub fn set_active(&mut self, url: &str, active: bool) -> RegistryResult<()> {
        if !self.feeds.contains_key(url) {
            return Err(RegistryError::UnknownFeed(url.to_string()));
        }
        self.commit(|feeds| {
            if let Some(feed) = feeds.get_mut(url) {
                feed.active = active;
            }
        })?;
        info!(url, active, "feed activity changed");
        Ok(())
    }

    /// Advance a feed's checkpoint. `last_check` never moves backwards.
    pub fn mark_checked(
        &mut self,
        url: &str,
        checked_at: DateTime<Utc>,
    ) -> RegistryResult<()> {
        if !self.feeds.contains_key(url) {
            return Err(RegistryError::UnknownFeed(url.to_string()));
        }
        self.commit(|feeds| {
            if let Some(feed) = feeds.get_mut(url) {
                feed.last_check = feed.last_check.max(checked_at);
            }
        })?;
        Ok(())
    }

    /// Apply a mutation and persist it; roll back the memory image when the
    /// write fails so state matches the file on disk.
    fn commit<F>(&mut self, mutate: F) -> RegistryResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, FeedRecord>),
    {
        let prior = self.feeds.clone();
        mutate(&mut self.feeds);
        if let Err(e) = self.persist() {
            self.feeds = prior;
            return Err(e.into());
        }
        Ok(())
    }

    fn persist(&self) -> Result<(), RecordError> {
        let bytes = serde_json::to_vec_pretty(&self.feeds)?;
        write_atomic(&self.path, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::testutil::{FailingFeedSource, StaticFeedSource};

    const URL: &str = "https://example.org/feed.xml";

    async fn registry_with_feed(dir: &TempDir) -> FeedRegistry {
        let mut registry = FeedRegistry::open(dir.path().join("feeds.json")).unwrap();
        let source = StaticFeedSource::new("Лента");
        registry.register(URL, 5, &source).await.unwrap();
        registry
    }

    #[tokio::test]
    async fn register_makes_feed_immediately_due() {
        let dir = TempDir::new().unwrap();
        let registry = registry_with_feed(&dir).await;

        let feed = registry.get(URL).unwrap();
        assert_eq!(feed.title, "Лента");
        assert!(feed.active);
        assert!(feed.is_due(Utc::now()));
    }

    #[tokio::test]
    async fn register_rejects_unparsable_feed() {
        let dir = TempDir::new().unwrap();
        let mut registry = FeedRegistry::open(dir.path().join("feeds.json")).unwrap();

        let err = registry
            .register(URL, 5, &FailingFeedSource)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation { .. }));
        assert!(registry.is_empty());
        // Nothing was persisted either.
        assert!(!dir.path().join("feeds.json").exists());
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feeds.json");
        {
            let _ = registry_with_feed(&dir).await;
        }
        let reopened = FeedRegistry::open(&path).unwrap();
        assert_eq!(reopened.list().len(), 1);
        assert_eq!(reopened.get(URL).unwrap().interval_minutes, 5);
    }

    #[tokio::test]
    async fn mark_checked_is_monotonic() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_with_feed(&dir).await;

        let t1 = Utc::now();
        registry.mark_checked(URL, t1).unwrap();
        assert_eq!(registry.get(URL).unwrap().last_check, t1);

        // An earlier timestamp never rewinds the checkpoint.
        registry
            .mark_checked(URL, t1 - Duration::minutes(30))
            .unwrap();
        assert_eq!(registry.get(URL).unwrap().last_check, t1);

        let t2 = t1 + Duration::minutes(1);
        registry.mark_checked(URL, t2).unwrap();
        assert_eq!(registry.get(URL).unwrap().last_check, t2);
    }

    #[tokio::test]
    async fn status_is_derived_from_schedule() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_with_feed(&dir).await;
        let now = Utc::now();

        registry.mark_checked(URL, now).unwrap();
        assert_eq!(registry.get(URL).unwrap().status(now), FeedStatus::Active);

        registry.set_active(URL, false).unwrap();
        assert_eq!(registry.get(URL).unwrap().status(now), FeedStatus::Paused);
        assert!(!registry.get(URL).unwrap().is_due(now));

        registry.set_active(URL, true).unwrap();
        let later = now + Duration::minutes(11);
        assert_eq!(registry.get(URL).unwrap().status(later), FeedStatus::Delayed);
    }

    #[tokio::test]
    async fn failed_persist_rolls_back_memory_and_disk() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_with_feed(&dir).await;
        let path = dir.path().join("feeds.json");
        let before = fs::read_to_string(&path).unwrap();

        // Break the atomic write by squatting on its temp path.
        fs::create_dir(dir.path().join("feeds.json.tmp")).unwrap();
        let err = registry.deregister(URL).unwrap_err();
        assert!(matches!(err, RegistryError::Persist(_)));

        // On-disk bytes are exactly the pre-mutation content and the
        // in-memory view still has the feed.
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert!(registry.get(URL).is_some());
    }

    #[tokio::test]
    async fn unknown_feed_mutations_fail() {
        let dir = TempDir::new().unwrap();
        let mut registry = FeedRegistry::open(dir.path().join("feeds.json")).unwrap();
        assert!(matches!(
            registry.deregister("https://nope"),
            Err(RegistryError::UnknownFeed(_))
        ));
        assert!(matches!(
            registry.set_active("https://nope", false),
            Err(RegistryError::UnknownFeed(_))
        ));
        assert!(matches!(
            registry.mark_checked("https://nope", Utc::now()),
            Err(RegistryError::UnknownFeed(_))
        ));
    }
}
