use std::path::Path;

use anyhow::Result;
use console::style;
use newswire_core::{ArticleStore, HttpArticleFetcher, IngestOutcome};

pub async fn run(data_dir: &Path, url: &str) -> Result<()> {
    let extractor = super::extractor();
    let mut store = ArticleStore::open(
        super::articles_dir(data_dir),
        super::normalizer(&extractor),
    )?;
    let fetcher = HttpArticleFetcher::new()?;

    match store.ingest(url, &fetcher, extractor.as_ref()).await? {
        IngestOutcome::Ingested(record) => {
            eprintln!(
                "{} Ingested: {}",
                style("●").green(),
                style(&record.title).bold()
            );
            eprintln!("  Id: {}", record.id);
            eprintln!("  Entities: {}", record.entities.len());
            eprintln!("  Actions: {}", record.actions.len());
        }
        IngestOutcome::AlreadyExists => {
            eprintln!("{} Already stored: {url}", style("○").dim());
        }
    }
    Ok(())
}
