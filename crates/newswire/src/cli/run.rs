use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use console::style;
use newswire_core::{
    ArticleStore, FeedChecker, FeedRegistry, HttpArticleFetcher, HttpFeedSource, Scheduler,
};
use tokio::sync::watch;
use tracing::warn;

/// Run the scheduler in the foreground until Ctrl-C.
pub async fn run(data_dir: &Path) -> Result<()> {
    let extractor = super::extractor();
    let registry = FeedRegistry::open(super::feeds_path(data_dir))?;
    let store = ArticleStore::open(
        super::articles_dir(data_dir),
        super::normalizer(&extractor),
    )?;
    let checker = FeedChecker::new(
        Arc::new(HttpFeedSource::new()?),
        Arc::new(HttpArticleFetcher::new()?),
        extractor,
    );

    eprintln!(
        "{} Monitoring {} feed(s) from {}",
        style("●").green(),
        registry.list().len(),
        data_dir.display()
    );
    eprintln!("  Press Ctrl-C to stop");

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = stop_tx.send(true);
            }
            Err(e) => warn!(error = %e, "failed to listen for shutdown signal"),
        }
    });

    let mut scheduler = Scheduler::new(registry, store, checker);
    scheduler.run(stop_rx).await;

    eprintln!("{} Stopped", style("○").dim());
    Ok(())
}
