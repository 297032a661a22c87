// src/ingest/mod.rs
pub mod providers;
pub mod staleness;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::model::{NewItem, ProcessReport, SourceUpdate};
use crate::store::ContentStore;
use types::FeedFetcher;

/// Summaries are clipped to this many characters after markup stripping.
pub const SUMMARY_MAX_CHARS: usize = 500;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_sources_processed_total",
            "Sources attempted across all batches."
        );
        describe_counter!("ingest_entries_total", "Entries parsed from feeds.");
        describe_counter!("ingest_items_new_total", "Items actually inserted.");
        describe_counter!(
            "ingest_dedup_skipped_total",
            "Candidate items skipped because their URL was already stored."
        );
        describe_counter!("ingest_fetch_errors_total", "Fetch/parse errors per source.");
        describe_histogram!("ingest_fetch_ms", "Per-source fetch+parse time in milliseconds.");
        describe_gauge!("ingest_last_run_ts", "Unix ts when a batch last finished.");
    });
}

/* ----------------------------
Text helpers shared by providers
---------------------------- */

/// Strip markup from a feed fragment: decode HTML entities, drop tags,
/// collapse whitespace.
pub fn strip_markup(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    let stripped = re_tags.replace_all(&decoded, "");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

/// Clip to at most `max` characters (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Best-effort `<img src>` scan over an entry's HTML body.
pub fn find_image_in_html(html: &str) -> Option<String> {
    static RE_IMG: OnceCell<Regex> = OnceCell::new();
    let re = RE_IMG.get_or_init(|| Regex::new(r#"(?is)<img[^>]+src=["']([^"']+)["']"#).unwrap());
    re.captures(html).map(|c| c[1].to_string())
}

/// Lenient publish-date parsing: RFC 2822 (RSS), then RFC 3339 (Atom),
/// falling back to `now`.
pub fn parse_entry_date(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    use time::format_description::well_known::{Rfc2822, Rfc3339};
    use time::OffsetDateTime;

    let Some(s) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return now;
    };
    let parsed = OffsetDateTime::parse(s, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(s, &Rfc3339))
        .ok();
    parsed
        .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), dt.nanosecond()))
        .unwrap_or(now)
}

/* ----------------------------
Limits / configuration
---------------------------- */

const ENV_MAX_CONCURRENCY: &str = "INGEST_MAX_CONCURRENCY";
const ENV_HTTP_TIMEOUT: &str = "INGEST_HTTP_TIMEOUT_SECS";
const ENV_BATCH_DEADLINE: &str = "INGEST_BATCH_DEADLINE_SECS";
const DEFAULT_INGEST_CONFIG_PATH: &str = "config/ingest.toml";

/// Resource bounds for a `process_feeds` batch.
#[derive(Debug, Clone)]
pub struct IngestLimits {
    /// Concurrent per-source fetches (semaphore permits).
    pub max_concurrency: usize,
    /// Per-request HTTP timeout for feed fetching.
    pub http_timeout_secs: u64,
    /// Optional wall-clock cap for a whole batch; in-flight work is cancelled
    /// when it expires.
    pub batch_deadline_secs: Option<u64>,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            http_timeout_secs: 30,
            batch_deadline_secs: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct IngestToml {
    ingest: IngestSection,
}

#[derive(Debug, Deserialize)]
struct IngestSection {
    max_concurrency: Option<usize>,
    http_timeout_secs: Option<u64>,
    batch_deadline_secs: Option<u64>,
}

impl IngestLimits {
    /// Load limits from `config/ingest.toml` when present, then apply env
    /// overrides (`INGEST_MAX_CONCURRENCY`, `INGEST_HTTP_TIMEOUT_SECS`,
    /// `INGEST_BATCH_DEADLINE_SECS`).
    pub fn load_default() -> Self {
        let mut limits = Self::from_toml_path(DEFAULT_INGEST_CONFIG_PATH).unwrap_or_default();

        if let Some(v) = env_u64(ENV_MAX_CONCURRENCY) {
            limits.max_concurrency = v as usize;
        }
        if let Some(v) = env_u64(ENV_HTTP_TIMEOUT) {
            limits.http_timeout_secs = v;
        }
        if let Some(v) = env_u64(ENV_BATCH_DEADLINE) {
            limits.batch_deadline_secs = Some(v);
        }
        limits.max_concurrency = limits.max_concurrency.max(1);
        limits
    }

    fn from_toml_path(path: &str) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        let parsed: IngestToml = toml::from_str(&content).ok()?;
        let defaults = Self::default();
        Some(Self {
            max_concurrency: parsed.ingest.max_concurrency.unwrap_or(defaults.max_concurrency),
            http_timeout_secs: parsed
                .ingest
                .http_timeout_secs
                .unwrap_or(defaults.http_timeout_secs),
            batch_deadline_secs: parsed.ingest.batch_deadline_secs,
        })
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/* ----------------------------
Coordinator
---------------------------- */

struct SourceOutcome {
    new_items: usize,
    error: Option<String>,
}

/// Fans fetch work out across sources with bounded concurrency, funnels
/// parsed entries through the dedup insert, and aggregates a partial-success
/// report. One failing source never affects its siblings.
pub struct IngestPipeline {
    store: Arc<dyn ContentStore>,
    fetchers: Arc<Vec<Arc<dyn FeedFetcher>>>,
    limits: IngestLimits,
}

impl IngestPipeline {
    pub fn new(
        store: Arc<dyn ContentStore>,
        fetchers: Vec<Arc<dyn FeedFetcher>>,
        limits: IngestLimits,
    ) -> Self {
        Self {
            store,
            fetchers: Arc::new(fetchers),
            limits,
        }
    }

    /// Process a batch of sources. Every source id is attempted; per-source
    /// failures are recorded in the report's `errors` and the rest of the
    /// batch carries on.
    pub async fn process_feeds(
        &self,
        source_ids: &[Uuid],
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> ProcessReport {
        ensure_metrics_described();

        let cancel = cancel.child_token();
        let deadline_task = self.limits.batch_deadline_secs.map(|secs| {
            let c = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                c.cancel();
            })
        });

        let semaphore = Arc::new(Semaphore::new(self.limits.max_concurrency.max(1)));
        let mut join = JoinSet::new();
        for &source_id in source_ids {
            let store = self.store.clone();
            let fetchers = self.fetchers.clone();
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();
            join.spawn(async move {
                let permit = tokio::select! {
                    _ = cancel.cancelled() => return cancelled(source_id),
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(p) => p,
                        Err(_) => return cancelled(source_id),
                    },
                };
                let outcome = tokio::select! {
                    _ = cancel.cancelled() => cancelled(source_id),
                    outcome = process_single(store, fetchers, source_id, force_refresh) => outcome,
                };
                drop(permit);
                outcome
            });
        }

        let mut report = ProcessReport::default();
        while let Some(joined) = join.join_next().await {
            match joined {
                Ok(outcome) => {
                    report.processed_sources += 1;
                    report.new_items += outcome.new_items;
                    if let Some(e) = outcome.error {
                        report.errors.push(e);
                    }
                }
                Err(e) => report.errors.push(format!("ingest task failed: {e}")),
            }
        }
        if let Some(t) = deadline_task {
            t.abort();
        }

        counter!("ingest_sources_processed_total").increment(report.processed_sources as u64);
        gauge!("ingest_last_run_ts").set(Utc::now().timestamp().max(0) as f64);
        info!(
            target: "ingest",
            processed = report.processed_sources,
            new_items = report.new_items,
            errors = report.errors.len(),
            "batch finished"
        );
        report
    }
}

fn cancelled(source_id: Uuid) -> SourceOutcome {
    SourceOutcome {
        new_items: 0,
        error: Some(format!("source {source_id}: cancelled before completion")),
    }
}

async fn process_single(
    store: Arc<dyn ContentStore>,
    fetchers: Arc<Vec<Arc<dyn FeedFetcher>>>,
    source_id: Uuid,
    force_refresh: bool,
) -> SourceOutcome {
    match process_single_inner(store, fetchers, source_id, force_refresh).await {
        Ok(new_items) => SourceOutcome {
            new_items,
            error: None,
        },
        Err(e) => {
            counter!("ingest_fetch_errors_total").increment(1);
            warn!(target: "ingest", source_id = %source_id, error = ?e, "source processing failed");
            SourceOutcome {
                new_items: 0,
                error: Some(format!("source {source_id}: {e:#}")),
            }
        }
    }
}

async fn process_single_inner(
    store: Arc<dyn ContentStore>,
    fetchers: Arc<Vec<Arc<dyn FeedFetcher>>>,
    source_id: Uuid,
    force_refresh: bool,
) -> anyhow::Result<usize> {
    let source = store.get_source(source_id).await?;

    if !source.active {
        info!(target: "ingest", source = %source.name, "source disabled, skipping");
        return Ok(0);
    }

    let decision = staleness::evaluate(
        source.last_fetched_at,
        source.fetch_interval_secs,
        Utc::now(),
        force_refresh,
    );
    if !decision.should_fetch {
        info!(target: "ingest", source = %source.name, reason = %decision.reason, "not due");
        return Ok(0);
    }

    let fetcher = fetchers
        .iter()
        .find(|f| f.kind() == source.kind)
        .ok_or_else(|| anyhow!("no fetcher registered for source kind `{}`", source.kind.as_str()))?;

    let t0 = std::time::Instant::now();
    let outcome = fetcher
        .fetch(&source)
        .await
        .with_context(|| format!("fetching `{}`", source.name))?;
    histogram_ms(t0.elapsed());

    if let Some(note) = &outcome.note {
        info!(target: "ingest", source = %source.name, note = %note, "fetcher note");
        if outcome.entries.is_empty() {
            // Placeholder fetchers report nothing to persist; leave
            // last_fetched_at untouched so a future real implementation is
            // picked up promptly.
            return Ok(0);
        }
    }

    let mut new_items = 0usize;
    let mut duplicates = 0u64;
    for entry in outcome.entries {
        if entry.url.is_empty() {
            continue;
        }
        let candidate = NewItem {
            source_id: source.id,
            title: entry.title,
            url: entry.url,
            summary: entry.summary,
            published_at: entry.published_at,
            image_url: entry.image_url,
        };
        match store.insert_item_if_absent(candidate).await? {
            Some(_) => new_items += 1,
            None => duplicates += 1,
        }
    }
    counter!("ingest_items_new_total").increment(new_items as u64);
    counter!("ingest_dedup_skipped_total").increment(duplicates);

    store
        .update_source(
            source.id,
            SourceUpdate {
                last_fetched_at: Some(Utc::now()),
                ..Default::default()
            },
        )
        .await?;

    info!(
        target: "ingest",
        source = %source.name,
        kind = source.kind.as_str(),
        new_items,
        duplicates,
        "source processed"
    );
    Ok(new_items)
}

fn histogram_ms(elapsed: Duration) {
    metrics::histogram!("ingest_fetch_ms").record(elapsed.as_secs_f64() * 1_000.0);
}
