// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::model::{Source, SourceKind};

/// One normalized candidate item parsed out of a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub published_at: DateTime<Utc>,
    pub image_url: Option<String>,
}

/// What a fetcher produced for one source. `note` carries an informational
/// message (e.g. a placeholder fetcher explaining why it returned nothing);
/// it is not an error.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub entries: Vec<FeedEntry>,
    pub note: Option<String>,
}

/// One fetch implementation per source kind; the coordinator dispatches on
/// `kind()` exactly once per source.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, source: &Source) -> Result<FetchOutcome>;
    fn kind(&self) -> SourceKind;
}
