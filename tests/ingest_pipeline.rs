// tests/ingest_pipeline.rs
//! Coordinator behavior with a mock fetcher and the in-memory store:
//! staleness gating, dedup idempotence, batch isolation, cancellation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use trendfeed::ingest::types::{FeedEntry, FeedFetcher, FetchOutcome};
use trendfeed::ingest::{IngestLimits, IngestPipeline};
use trendfeed::model::{NewSource, Source, SourceKind, SourceUpdate};
use trendfeed::store::{memory::MemoryStore, ContentStore};

struct MockFetcher {
    kind: SourceKind,
    entries: Vec<FeedEntry>,
    fail: bool,
    delay_ms: u64,
    calls: Arc<AtomicUsize>,
}

impl MockFetcher {
    fn new(kind: SourceKind, entries: Vec<FeedEntry>) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(Self {
                kind,
                entries,
                fail: false,
                delay_ms: 0,
                calls: calls.clone(),
            }),
            calls,
        )
    }

    fn failing(kind: SourceKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            entries: Vec::new(),
            fail: true,
            delay_ms: 0,
            calls: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn slow(kind: SourceKind, entries: Vec<FeedEntry>, delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            kind,
            entries,
            fail: false,
            delay_ms,
            calls: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl FeedFetcher for MockFetcher {
    async fn fetch(&self, _source: &Source) -> Result<FetchOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail {
            bail!("simulated fetch failure");
        }
        Ok(FetchOutcome {
            entries: self.entries.clone(),
            note: None,
        })
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }
}

fn entries(urls: &[&str]) -> Vec<FeedEntry> {
    let now = Utc::now();
    urls.iter()
        .map(|u| FeedEntry {
            title: format!("Entry {u}"),
            url: u.to_string(),
            summary: None,
            published_at: now,
            image_url: None,
        })
        .collect()
}

async fn seed_source(store: &MemoryStore, kind: SourceKind) -> Source {
    store
        .create_source(NewSource {
            user_id: Uuid::new_v4(),
            name: format!("{} source", kind.as_str()),
            kind,
            locator: "https://example.com/feed.xml".into(),
            fetch_interval_secs: 3600,
        })
        .await
        .unwrap()
}

fn pipeline(
    store: Arc<MemoryStore>,
    fetchers: Vec<Arc<dyn FeedFetcher>>,
    limits: IngestLimits,
) -> IngestPipeline {
    IngestPipeline::new(store, fetchers, limits)
}

#[tokio::test]
async fn fresh_source_is_skipped_and_not_fetched() {
    let store = Arc::new(MemoryStore::new());
    let source = seed_source(&store, SourceKind::Rss).await;
    store
        .update_source(
            source.id,
            SourceUpdate {
                last_fetched_at: Some(Utc::now() - Duration::seconds(1800)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let (fetcher, calls) = MockFetcher::new(SourceKind::Rss, entries(&["https://e.com/1"]));
    let p = pipeline(store.clone(), vec![fetcher as Arc<dyn FeedFetcher>], IngestLimits::default());

    let report = p
        .process_feeds(&[source.id], false, &CancellationToken::new())
        .await;
    assert_eq!(report.processed_sources, 1);
    assert_eq!(report.new_items, 0);
    assert!(report.errors.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0, "stale gate must skip the fetch");

    // forced refresh overrides the gate
    let report = p
        .process_feeds(&[source.id], true, &CancellationToken::new())
        .await;
    assert_eq!(report.new_items, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn disabled_source_is_never_fetched() {
    let store = Arc::new(MemoryStore::new());
    let source = seed_source(&store, SourceKind::Rss).await;
    store
        .update_source(
            source.id,
            SourceUpdate {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let (fetcher, calls) = MockFetcher::new(SourceKind::Rss, entries(&["https://e.com/1"]));
    let p = pipeline(store.clone(), vec![fetcher as Arc<dyn FeedFetcher>], IngestLimits::default());

    let report = p
        .process_feeds(&[source.id], true, &CancellationToken::new())
        .await;
    assert_eq!(report.new_items, 0);
    assert!(report.errors.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn repeated_runs_insert_each_url_once() {
    let store = Arc::new(MemoryStore::new());
    let source = seed_source(&store, SourceKind::Rss).await;
    let urls = ["https://e.com/a", "https://e.com/b", "https://e.com/c"];
    let (fetcher, _) = MockFetcher::new(SourceKind::Rss, entries(&urls));
    let p = pipeline(store.clone(), vec![fetcher as Arc<dyn FeedFetcher>], IngestLimits::default());

    let first = p
        .process_feeds(&[source.id], true, &CancellationToken::new())
        .await;
    assert_eq!(first.new_items, 3);

    let second = p
        .process_feeds(&[source.id], true, &CancellationToken::new())
        .await;
    assert_eq!(second.new_items, 0, "second run must dedup everything");

    let stored = store.list_items_for_sources(&[source.id], None).await.unwrap();
    assert_eq!(stored.len(), urls.len());
}

#[tokio::test]
async fn concurrent_batches_yield_distinct_url_count() {
    let store = Arc::new(MemoryStore::new());
    let source = seed_source(&store, SourceKind::Rss).await;
    let urls = ["https://e.com/a", "https://e.com/b", "https://e.com/c"];
    let fetcher = MockFetcher::slow(SourceKind::Rss, entries(&urls), 20);
    let p = pipeline(store.clone(), vec![fetcher as Arc<dyn FeedFetcher>], IngestLimits::default());

    let cancel = CancellationToken::new();
    let ids = [source.id];
    let (r1, r2) = tokio::join!(
        p.process_feeds(&ids, true, &cancel),
        p.process_feeds(&ids, true, &cancel),
    );

    // Both batches fetched the same content concurrently; the atomic insert
    // keeps the store at exactly one item per distinct URL.
    assert_eq!(r1.new_items + r2.new_items, urls.len());
    let stored = store.list_items_for_sources(&[source.id], None).await.unwrap();
    assert_eq!(stored.len(), urls.len());
}

#[tokio::test]
async fn cross_posted_url_is_stored_once_across_sources() {
    let store = Arc::new(MemoryStore::new());
    let a = seed_source(&store, SourceKind::Rss).await;
    let b = seed_source(&store, SourceKind::Rss).await;
    let (fetcher, _) = MockFetcher::new(SourceKind::Rss, entries(&["https://e.com/shared"]));
    let p = pipeline(store.clone(), vec![fetcher as Arc<dyn FeedFetcher>], IngestLimits::default());

    let report = p
        .process_feeds(&[a.id, b.id], true, &CancellationToken::new())
        .await;
    assert_eq!(report.processed_sources, 2);
    assert_eq!(report.new_items, 1);

    let stored = store
        .list_items_for_sources(&[a.id, b.id], None)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn failing_source_does_not_reduce_sibling_contribution() {
    let store = Arc::new(MemoryStore::new());
    let healthy = seed_source(&store, SourceKind::VideoChannel).await;
    let broken = seed_source(&store, SourceKind::Rss).await;

    let (video, _) = MockFetcher::new(
        SourceKind::VideoChannel,
        entries(&["https://v.com/1", "https://v.com/2"]),
    );
    let rss = MockFetcher::failing(SourceKind::Rss);
    let p = pipeline(store.clone(), vec![video as Arc<dyn FeedFetcher>, rss], IngestLimits::default());

    let report = p
        .process_feeds(&[healthy.id, broken.id], true, &CancellationToken::new())
        .await;
    assert_eq!(report.processed_sources, 2);
    assert_eq!(report.new_items, 2, "healthy source output must be intact");
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("simulated fetch failure"));
}

#[tokio::test]
async fn unknown_source_id_is_a_source_scoped_error() {
    let store = Arc::new(MemoryStore::new());
    let known = seed_source(&store, SourceKind::Rss).await;
    let (fetcher, _) = MockFetcher::new(SourceKind::Rss, entries(&["https://e.com/1"]));
    let p = pipeline(store.clone(), vec![fetcher as Arc<dyn FeedFetcher>], IngestLimits::default());

    let ghost = Uuid::new_v4();
    let report = p
        .process_feeds(&[known.id, ghost], true, &CancellationToken::new())
        .await;
    assert_eq!(report.processed_sources, 2);
    assert_eq!(report.new_items, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("not found"));
}

#[tokio::test]
async fn successful_fetch_advances_last_fetched_at() {
    let store = Arc::new(MemoryStore::new());
    let source = seed_source(&store, SourceKind::Rss).await;
    assert!(source.last_fetched_at.is_none());

    let (fetcher, _) = MockFetcher::new(SourceKind::Rss, entries(&["https://e.com/1"]));
    let p = pipeline(store.clone(), vec![fetcher as Arc<dyn FeedFetcher>], IngestLimits::default());
    p.process_feeds(&[source.id], false, &CancellationToken::new())
        .await;

    let after = store.get_source(source.id).await.unwrap();
    assert!(after.last_fetched_at.is_some());
}

#[tokio::test]
async fn failed_fetch_leaves_last_fetched_at_untouched() {
    let store = Arc::new(MemoryStore::new());
    let source = seed_source(&store, SourceKind::Rss).await;

    let fetcher = MockFetcher::failing(SourceKind::Rss);
    let p = pipeline(store.clone(), vec![fetcher as Arc<dyn FeedFetcher>], IngestLimits::default());
    let report = p
        .process_feeds(&[source.id], false, &CancellationToken::new())
        .await;
    assert_eq!(report.errors.len(), 1);

    // The staleness gate must allow a prompt retry on the next run.
    let after = store.get_source(source.id).await.unwrap();
    assert!(after.last_fetched_at.is_none());
}

#[tokio::test]
async fn social_placeholder_reports_zero_without_error() {
    use trendfeed::ingest::providers::SocialStreamFetcher;

    let store = Arc::new(MemoryStore::new());
    let source = seed_source(&store, SourceKind::SocialStream).await;
    let p = pipeline(
        store.clone(),
        vec![Arc::new(SocialStreamFetcher::new())],
        IngestLimits::default(),
    );

    let report = p
        .process_feeds(&[source.id], true, &CancellationToken::new())
        .await;
    assert_eq!(report.processed_sources, 1);
    assert_eq!(report.new_items, 0);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn cancelled_batch_stops_in_flight_work() {
    let store = Arc::new(MemoryStore::new());
    let source = seed_source(&store, SourceKind::Rss).await;
    let fetcher = MockFetcher::slow(SourceKind::Rss, entries(&["https://e.com/1"]), 200);
    let p = pipeline(store.clone(), vec![fetcher as Arc<dyn FeedFetcher>], IngestLimits::default());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = p.process_feeds(&[source.id], true, &cancel).await;

    assert_eq!(report.new_items, 0);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("cancelled"));
    let stored = store.list_items_for_sources(&[source.id], None).await.unwrap();
    assert!(stored.is_empty());
}
