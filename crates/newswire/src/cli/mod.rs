pub mod feeds;
pub mod ingest;
pub mod run;
pub mod search;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use newswire_core::{EntityNormalizer, LexiconExtractor};

#[derive(Parser)]
#[command(
    name = "nwr",
    about = "RSS monitoring with entity-indexed article search",
    version
)]
pub struct Cli {
    /// Data directory (defaults to the platform's local app-data dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a feed for periodic checking
    Register {
        /// Feed URL
        url: String,
        /// Check interval in minutes
        #[arg(short, long, default_value_t = 5)]
        interval: u32,
    },
    /// Remove a feed and its schedule state
    Deregister {
        /// Feed URL
        url: String,
    },
    /// Suspend checks for a feed without removing it
    Pause {
        /// Feed URL
        url: String,
    },
    /// Resume checks for a paused feed
    Resume {
        /// Feed URL
        url: String,
    },
    /// List registered feeds with schedule status
    Feeds,
    /// Find stored articles mentioning an entity
    Search {
        /// Entity name or alias
        term: String,
        /// Restrict to a kind: location, person, organization
        #[arg(short, long)]
        kind: Option<String>,
    },
    /// Fetch and index a single article URL
    Ingest {
        /// Article URL
        url: String,
    },
    /// Run the polling scheduler until interrupted
    Run,
}

/// Resolve the data directory, creating it when missing.
pub fn data_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    let dir = match flag {
        Some(dir) => dir,
        None => dirs::data_local_dir()
            .context("no local data directory on this platform")?
            .join("newswire"),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create data directory {}", dir.display()))?;
    Ok(dir)
}

pub(crate) fn feeds_path(data_dir: &Path) -> PathBuf {
    data_dir.join("feeds.json")
}

pub(crate) fn articles_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("articles")
}

/// The one extraction capability every command shares. It doubles as the
/// lemmatizer behind normalization, so search terms and extracted mentions
/// collapse to identical keys.
pub(crate) fn extractor() -> Arc<LexiconExtractor> {
    Arc::new(LexiconExtractor::with_default_lexicon())
}

pub(crate) fn normalizer(extractor: &Arc<LexiconExtractor>) -> EntityNormalizer {
    EntityNormalizer::new(extractor.clone())
}
