// src/model.rs
//! Domain types shared by ingestion, scoring, and the API layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lower bound for a source's refetch interval (5 minutes).
pub const MIN_FETCH_INTERVAL_SECS: u64 = 300;
/// Upper bound for a source's refetch interval (7 days).
pub const MAX_FETCH_INTERVAL_SECS: u64 = 604_800;

/// Clamp a requested refetch interval into the configured bounds.
/// Applied at source creation and on every update.
pub fn clamp_fetch_interval(secs: u64) -> u64 {
    secs.clamp(MIN_FETCH_INTERVAL_SECS, MAX_FETCH_INTERVAL_SECS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Rss,
    VideoChannel,
    SocialStream,
}

impl SourceKind {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Rss => "rss",
            SourceKind::VideoChannel => "video_channel",
            SourceKind::SocialStream => "social_stream",
        }
    }
}

/// A configured external feed owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub kind: SourceKind,
    /// Feed URL for RSS sources, channel handle or id for video sources,
    /// account handle for social streams.
    pub locator: String,
    pub fetch_interval_secs: u64,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Registration payload for a new source.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSource {
    pub user_id: Uuid,
    pub name: String,
    pub kind: SourceKind,
    pub locator: String,
    #[serde(default = "default_fetch_interval")]
    pub fetch_interval_secs: u64,
}

fn default_fetch_interval() -> u64 {
    3600
}

/// Partial update applied to a stored source. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct SourceUpdate {
    pub name: Option<String>,
    pub locator: Option<String>,
    pub fetch_interval_secs: Option<u64>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub active: Option<bool>,
}

/// A single piece of ingested content. The canonical `url` is the dedup key:
/// at most one item exists per URL across all sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub source_id: Uuid,
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub published_at: DateTime<Utc>,
    pub image_url: Option<String>,
    /// Normalized [0,1] ranking signal, recomputed on demand.
    pub trend_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Candidate item produced by a feed fetcher, before it gets an identity.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub source_id: Uuid,
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub published_at: DateTime<Utc>,
    pub image_url: Option<String>,
}

/// Aggregate result of one `process_feeds` batch. Always a partial-success
/// report: per-source failures land in `errors`, never abort the batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessReport {
    pub processed_sources: usize,
    pub new_items: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecalcReport {
    pub items_processed: usize,
    pub time_taken_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordTrend {
    pub keyword: String,
    pub frequency: usize,
    pub direction: TrendDirection,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    pub analysis_time: DateTime<Utc>,
    pub time_window_hours: i64,
    pub total_items_analyzed: usize,
    pub average_trend_score: f64,
    pub analysis_version: &'static str,
}
