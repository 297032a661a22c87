// src/ingest/providers/social.rs
//! Social stream fetcher. Platform APIs require credentialed integrations
//! that are not wired up yet, so this fetcher is an explicit placeholder: it
//! reports zero entries with a note instead of failing the source.

use anyhow::Result;
use async_trait::async_trait;

use crate::ingest::types::{FeedFetcher, FetchOutcome};
use crate::model::{Source, SourceKind};

#[derive(Debug, Default)]
pub struct SocialStreamFetcher;

impl SocialStreamFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FeedFetcher for SocialStreamFetcher {
    async fn fetch(&self, source: &Source) -> Result<FetchOutcome> {
        Ok(FetchOutcome {
            entries: Vec::new(),
            note: Some(format!(
                "social stream ingestion not yet implemented (source `{}`)",
                source.name
            )),
        })
    }

    fn kind(&self) -> SourceKind {
        SourceKind::SocialStream
    }
}
