//! Durable record sets.
//!
//! Persistence is a single JSON file per table, replaced atomically: write a
//! sibling temp file, fsync, rename over the target. A failed write leaves
//! the previous file bytes untouched, so readers never observe a partial
//! table.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type RecordResult<T> = Result<T, RecordError>;

/// Replace the contents of `path` atomically.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> RecordResult<()> {
    let tmp = temp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map_or_else(
        || std::ffi::OsString::from("record"),
        std::ffi::OsStr::to_os_string,
    );
    name.push(".tmp");
    path.with_file_name(name)
}

/// A string-keyed map persisted as one human-inspectable JSON file.
///
/// Mutations are in-memory; [`JsonTable::persist`] makes them durable. The
/// caller decides the persist points, which is what lets the article store
/// order its index writes.
#[derive(Debug)]
pub struct JsonTable<V> {
    path: PathBuf,
    entries: BTreeMap<String, V>,
}

impl<V> JsonTable<V>
where
    V: Serialize + DeserializeOwned,
{
    /// Open a table, creating an empty file when none exists.
    pub fn open(path: impl Into<PathBuf>) -> RecordResult<Self> {
        let path = path.into();
        if path.exists() {
            Self::load(path)
        } else {
            let table = Self {
                path,
                entries: BTreeMap::new(),
            };
            table.persist()?;
            Ok(table)
        }
    }

    /// Read a point-in-time snapshot without ever writing.
    ///
    /// A missing file reads as an empty table.
    pub fn snapshot(path: impl Into<PathBuf>) -> RecordResult<Self> {
        let path = path.into();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self {
                path,
                entries: BTreeMap::new(),
            })
        }
    }

    fn load(path: PathBuf) -> RecordResult<Self> {
        let bytes = fs::read(&path)?;
        let entries = serde_json::from_slice(&bytes)?;
        Ok(Self { path, entries })
    }

    pub fn persist(&self) -> RecordResult<()> {
        let bytes = serde_json::to_vec_pretty(&self.entries)?;
        write_atomic(&self.path, &bytes)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        self.entries.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> JsonTable<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    /// Apply a mutation and persist it; restore the previous entries when
    /// the write fails, so memory never diverges from the file on disk.
    pub fn commit<F>(&mut self, mutate: F) -> RecordResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, V>),
    {
        let prior = self.entries.clone();
        mutate(&mut self.entries);
        if let Err(e) = self.persist() {
            self.entries = prior;
            return Err(e);
        }
        Ok(())
    }
}
