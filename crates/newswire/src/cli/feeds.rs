use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use console::style;
use newswire_core::{FeedRegistry, FeedStatus, HttpFeedSource};

pub async fn run_register(data_dir: &Path, url: &str, interval: u32) -> Result<()> {
    let mut registry = FeedRegistry::open(super::feeds_path(data_dir))?;
    let source = HttpFeedSource::new()?;
    let record = registry.register(url, interval, &source).await?;

    eprintln!(
        "{} Registered: {}",
        style("●").green(),
        style(&record.title).bold()
    );
    eprintln!("  URL: {}", record.url);
    eprintln!("  Interval: every {} min", record.interval_minutes);
    Ok(())
}

pub fn run_deregister(data_dir: &Path, url: &str) -> Result<()> {
    let mut registry = FeedRegistry::open(super::feeds_path(data_dir))?;
    registry.deregister(url)?;
    eprintln!("{} Deregistered: {url}", style("●").green());
    Ok(())
}

pub fn run_set_active(data_dir: &Path, url: &str, active: bool) -> Result<()> {
    let mut registry = FeedRegistry::open(super::feeds_path(data_dir))?;
    registry.set_active(url, active)?;
    let verb = if active { "Resumed" } else { "Paused" };
    eprintln!("{} {verb}: {url}", style("●").green());
    Ok(())
}

pub fn run_list(data_dir: &Path) -> Result<()> {
    let registry = FeedRegistry::open(super::feeds_path(data_dir))?;
    if registry.is_empty() {
        eprintln!("{} No feeds registered", style("○").dim());
        eprintln!("  Run 'nwr register <url>' to add one");
        return Ok(());
    }

    let now = Utc::now();
    for feed in registry.list() {
        let marker = match feed.status(now) {
            FeedStatus::Active => style("●").green(),
            FeedStatus::Paused => style("○").dim(),
            FeedStatus::Delayed => style("●").yellow(),
        };
        eprintln!("{} {}", marker, style(&feed.title).bold());
        eprintln!("  URL: {}", feed.url);
        eprintln!(
            "  Every {} min, status {}, last check {}",
            feed.interval_minutes,
            feed.status(now),
            feed.last_check.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    Ok(())
}
