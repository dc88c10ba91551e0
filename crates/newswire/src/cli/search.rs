use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use console::style;
use newswire_core::{EntityKind, SearchIndex};

pub fn run(data_dir: &Path, term: &str, kind: Option<&str>) -> Result<()> {
    let kind = kind.map(EntityKind::from_str).transpose()?;

    let extractor = super::extractor();
    let index = SearchIndex::open(super::articles_dir(data_dir), super::normalizer(&extractor));
    let hits = index.search(term, kind)?;

    if hits.is_empty() {
        eprintln!("{} No articles mention '{term}'", style("○").dim());
        return Ok(());
    }

    eprintln!(
        "{} {} article(s) mention '{term}'",
        style("●").green(),
        hits.len()
    );
    for hit in &hits {
        println!();
        println!("{}", style(&hit.title).bold());
        println!("  {}", hit.url);
        println!("  {}", hit.published_at.format("%Y-%m-%d %H:%M UTC"));
        println!("  {}", hit.preview);
    }
    Ok(())
}
