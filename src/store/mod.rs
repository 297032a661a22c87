// src/store/mod.rs
//! Persistence collaborator seam. The engine never talks to a database
//! directly; everything goes through [`ContentStore`], so real backends live
//! out-of-crate and tests run against [`memory::MemoryStore`].

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{Item, NewItem, NewSource, Source, SourceUpdate};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("source {0} not found")]
    SourceNotFound(Uuid),
    #[error("item {0} not found")]
    ItemNotFound(Uuid),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn list_sources_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Source>>;

    async fn get_source(&self, id: Uuid) -> StoreResult<Source>;

    async fn create_source(&self, source: NewSource) -> StoreResult<Source>;

    async fn update_source(&self, id: Uuid, update: SourceUpdate) -> StoreResult<Source>;

    async fn delete_source(&self, id: Uuid) -> StoreResult<()>;

    async fn find_item_by_url(&self, url: &str) -> StoreResult<Option<Item>>;

    /// Atomic insert keyed by canonical URL. Returns `None` when an item with
    /// the same URL already exists; concurrent callers racing on one URL see
    /// exactly one `Some`.
    async fn insert_item_if_absent(&self, item: NewItem) -> StoreResult<Option<Item>>;

    async fn get_item(&self, id: Uuid) -> StoreResult<Item>;

    async fn update_item_score(&self, id: Uuid, score: f64) -> StoreResult<()>;

    /// Items belonging to any of `source_ids`, optionally restricted to those
    /// published after the cutoff, newest first.
    async fn list_items_for_sources(
        &self,
        source_ids: &[Uuid],
        published_after: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Item>>;
}
