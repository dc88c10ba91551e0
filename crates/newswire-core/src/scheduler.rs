//! The polling loop.
//!
//! One dedicated task drives all feed checks sequentially: a single linear
//! writer for both the registry file and the article store, so no index or
//! registry write ever races another. Cancellation is cooperative and is
//! observed at the tick boundary and between feeds, never mid-fetch.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info};

use crate::checker::FeedChecker;
use crate::registry::FeedRegistry;
use crate::store::ArticleStore;

const TICK: Duration = Duration::from_secs(60);

pub struct Scheduler {
    registry: FeedRegistry,
    store: ArticleStore,
    checker: FeedChecker,
    tick: Duration,
}

impl Scheduler {
    #[must_use]
    pub fn new(registry: FeedRegistry, store: ArticleStore, checker: FeedChecker) -> Self {
        Self {
            registry,
            store,
            checker,
            tick: TICK,
        }
    }

    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &FeedRegistry {
        &self.registry
    }

    #[must_use]
    pub fn store(&self) -> &ArticleStore {
        &self.store
    }

    /// Run until `stop` flips to `true` or its sender is dropped. An
    /// in-flight feed check finishes before the loop exits.
    pub async fn run(&mut self, mut stop: watch::Receiver<bool>) {
        info!(tick_secs = self.tick.as_secs(), "scheduler started");
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = stop.changed() => {
                    // A dropped sender means nobody can ever request a stop;
                    // treat it as one instead of spinning on the closed
                    // channel.
                    if changed.is_err() {
                        break;
                    }
                }
            }
            if *stop.borrow() {
                break;
            }
            self.run_pass(Some(&stop)).await;
        }
        info!("scheduler stopped");
    }

    /// One pass over all currently due feeds.
    pub async fn run_pass(&mut self, stop: Option<&watch::Receiver<bool>>) {
        let now = Utc::now();
        let due: Vec<_> = self
            .registry
            .list()
            .into_iter()
            .filter(|feed| feed.is_due(now))
            .collect();

        for feed in due {
            if stop.is_some_and(|s| *s.borrow()) {
                break;
            }
            let checked_at = self.checker.check(&feed, &mut self.store).await;
            // A feed-level persistence failure is isolated like any other
            // feed-level error; the next pass retries.
            if let Err(e) = self.registry.mark_checked(&feed.url, checked_at) {
                error!(url = %feed.url, error = %e, "failed to persist checkpoint");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    use super::*;
    use crate::entity::EntityKind;
    use crate::normalize::EntityNormalizer;
    use crate::search::SearchIndex;
    use crate::testutil::{test_lexicon, StaticFeedSource, StaticFetcher};

    #[tokio::test]
    async fn due_cycle_ingests_and_indexes_end_to_end() {
        let dir = TempDir::new().unwrap();
        let articles_dir = dir.path().join("articles");
        let normalizer = EntityNormalizer::new(Arc::new(test_lexicon()));

        let source = Arc::new(
            StaticFeedSource::new("Лента").with_entry(
                Some("https://example.org/u1"),
                Some(Utc::now() - ChronoDuration::hours(2)),
            ),
        );

        let mut registry = FeedRegistry::open(dir.path().join("feeds.json")).unwrap();
        registry
            .register("https://example.org/feed.xml", 5, source.as_ref())
            .await
            .unwrap();
        let registered_last_check = registry.get("https://example.org/feed.xml").unwrap().last_check;

        let store = ArticleStore::open(&articles_dir, normalizer.clone()).unwrap();
        let checker = FeedChecker::new(
            source,
            Arc::new(StaticFetcher::new(
                "Новость дня",
                "В Москве Иванов сказал, что работа идёт.",
            )),
            Arc::new(test_lexicon()),
        );

        let mut scheduler = Scheduler::new(registry, store, checker);
        scheduler.run_pass(None).await;

        // The checkpoint advanced and never went backwards.
        let feed = scheduler.registry().get("https://example.org/feed.xml").unwrap();
        assert!(feed.last_check > registered_last_check);

        // An alias of the location finds exactly the ingested article.
        let index = SearchIndex::open(&articles_dir, normalizer);
        let hits = index.search("мск", Some(EntityKind::Location)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://example.org/u1");

        // And the person's action was attributed with the verb lemma.
        let record = scheduler
            .store()
            .get_by_url("https://example.org/u1")
            .unwrap()
            .unwrap();
        assert_eq!(record.actions.len(), 1);
        assert_eq!(record.actions[0].person, "Иванов");
        assert_eq!(record.actions[0].verb, "сказать");
    }

    #[tokio::test]
    async fn second_pass_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let normalizer = EntityNormalizer::new(Arc::new(test_lexicon()));

        let source = Arc::new(
            StaticFeedSource::new("Лента")
                .with_entry(Some("https://example.org/u1"), Some(Utc::now())),
        );

        let mut registry = FeedRegistry::open(dir.path().join("feeds.json")).unwrap();
        registry
            .register("https://example.org/feed.xml", 5, source.as_ref())
            .await
            .unwrap();

        let store = ArticleStore::open(dir.path().join("articles"), normalizer).unwrap();
        let checker = FeedChecker::new(
            source,
            Arc::new(StaticFetcher::new("t", "В Москве событие.")),
            Arc::new(test_lexicon()),
        );

        let mut scheduler = Scheduler::new(registry, store, checker);
        scheduler.run_pass(None).await;
        assert_eq!(scheduler.store().article_count(), 1);

        // The feed is no longer due, and even a forced pass would dedup.
        scheduler.run_pass(None).await;
        assert_eq!(scheduler.store().article_count(), 1);
    }

    #[tokio::test]
    async fn inactive_feeds_are_skipped() {
        let dir = TempDir::new().unwrap();
        let normalizer = EntityNormalizer::new(Arc::new(test_lexicon()));

        let source = Arc::new(
            StaticFeedSource::new("Лента")
                .with_entry(Some("https://example.org/u1"), Some(Utc::now())),
        );

        let mut registry = FeedRegistry::open(dir.path().join("feeds.json")).unwrap();
        registry
            .register("https://example.org/feed.xml", 5, source.as_ref())
            .await
            .unwrap();
        registry
            .set_active("https://example.org/feed.xml", false)
            .unwrap();

        let store = ArticleStore::open(dir.path().join("articles"), normalizer).unwrap();
        let checker = FeedChecker::new(
            source,
            Arc::new(StaticFetcher::new("t", "текст")),
            Arc::new(test_lexicon()),
        );

        let mut scheduler = Scheduler::new(registry, store, checker);
        scheduler.run_pass(None).await;
        assert_eq!(scheduler.store().article_count(), 0);
    }

    #[tokio::test]
    async fn stop_signal_terminates_the_loop() {
        let dir = TempDir::new().unwrap();
        let normalizer = EntityNormalizer::new(Arc::new(test_lexicon()));

        let registry = FeedRegistry::open(dir.path().join("feeds.json")).unwrap();
        let store = ArticleStore::open(dir.path().join("articles"), normalizer).unwrap();
        let checker = FeedChecker::new(
            Arc::new(StaticFeedSource::new("Лента")),
            Arc::new(StaticFetcher::new("t", "текст")),
            Arc::new(test_lexicon()),
        );

        let mut scheduler =
            Scheduler::new(registry, store, checker).with_tick(Duration::from_millis(10));

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        // Returns promptly instead of ticking forever.
        tokio::time::timeout(Duration::from_secs(5), scheduler.run(rx))
            .await
            .expect("scheduler must observe the stop signal");
    }

    #[tokio::test]
    async fn dropped_stop_sender_terminates_the_loop() {
        let dir = TempDir::new().unwrap();
        let normalizer = EntityNormalizer::new(Arc::new(test_lexicon()));

        let registry = FeedRegistry::open(dir.path().join("feeds.json")).unwrap();
        let store = ArticleStore::open(dir.path().join("articles"), normalizer).unwrap();
        let checker = FeedChecker::new(
            Arc::new(StaticFeedSource::new("Лента")),
            Arc::new(StaticFetcher::new("t", "текст")),
            Arc::new(test_lexicon()),
        );

        // A long tick so only the closed channel can end the loop.
        let mut scheduler =
            Scheduler::new(registry, store, checker).with_tick(Duration::from_secs(3600));

        let (tx, rx) = watch::channel(false);
        drop(tx);

        tokio::time::timeout(Duration::from_secs(5), scheduler.run(rx))
            .await
            .expect("scheduler must stop once the channel closes");
    }
}
