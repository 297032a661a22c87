// src/store/memory.rs
//! In-memory [`ContentStore`] used by tests and local runs. A single `RwLock`
//! over the whole state keeps `insert_item_if_absent` atomic: the URL index
//! check and the insert happen under one write guard.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{clamp_fetch_interval, Item, NewItem, NewSource, Source, SourceUpdate};
use crate::store::{ContentStore, StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    sources: HashMap<Uuid, Source>,
    items: HashMap<Uuid, Item>,
    items_by_url: HashMap<String, Uuid>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("memory store lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn list_sources_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Source>> {
        let guard = self.read();
        let mut out: Vec<Source> = guard
            .sources
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.created_at);
        Ok(out)
    }

    async fn get_source(&self, id: Uuid) -> StoreResult<Source> {
        self.read()
            .sources
            .get(&id)
            .cloned()
            .ok_or(StoreError::SourceNotFound(id))
    }

    async fn create_source(&self, source: NewSource) -> StoreResult<Source> {
        let created = Source {
            id: Uuid::new_v4(),
            user_id: source.user_id,
            name: source.name,
            kind: source.kind,
            locator: source.locator,
            fetch_interval_secs: clamp_fetch_interval(source.fetch_interval_secs),
            last_fetched_at: None,
            active: true,
            created_at: Utc::now(),
        };
        self.write().sources.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_source(&self, id: Uuid, update: SourceUpdate) -> StoreResult<Source> {
        let mut guard = self.write();
        let source = guard
            .sources
            .get_mut(&id)
            .ok_or(StoreError::SourceNotFound(id))?;
        if let Some(name) = update.name {
            source.name = name;
        }
        if let Some(locator) = update.locator {
            source.locator = locator;
        }
        if let Some(interval) = update.fetch_interval_secs {
            source.fetch_interval_secs = clamp_fetch_interval(interval);
        }
        if let Some(ts) = update.last_fetched_at {
            source.last_fetched_at = Some(ts);
        }
        if let Some(active) = update.active {
            source.active = active;
        }
        Ok(source.clone())
    }

    async fn delete_source(&self, id: Uuid) -> StoreResult<()> {
        self.write()
            .sources
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::SourceNotFound(id))
    }

    async fn find_item_by_url(&self, url: &str) -> StoreResult<Option<Item>> {
        let guard = self.read();
        Ok(guard
            .items_by_url
            .get(url)
            .and_then(|id| guard.items.get(id))
            .cloned())
    }

    async fn insert_item_if_absent(&self, item: NewItem) -> StoreResult<Option<Item>> {
        let mut guard = self.write();
        if guard.items_by_url.contains_key(&item.url) {
            return Ok(None);
        }
        let stored = Item {
            id: Uuid::new_v4(),
            source_id: item.source_id,
            title: item.title,
            url: item.url,
            summary: item.summary,
            published_at: item.published_at,
            image_url: item.image_url,
            trend_score: None,
            created_at: Utc::now(),
        };
        guard.items_by_url.insert(stored.url.clone(), stored.id);
        guard.items.insert(stored.id, stored.clone());
        Ok(Some(stored))
    }

    async fn get_item(&self, id: Uuid) -> StoreResult<Item> {
        self.read()
            .items
            .get(&id)
            .cloned()
            .ok_or(StoreError::ItemNotFound(id))
    }

    async fn update_item_score(&self, id: Uuid, score: f64) -> StoreResult<()> {
        let mut guard = self.write();
        let item = guard.items.get_mut(&id).ok_or(StoreError::ItemNotFound(id))?;
        item.trend_score = Some(score.clamp(0.0, 1.0));
        Ok(())
    }

    async fn list_items_for_sources(
        &self,
        source_ids: &[Uuid],
        published_after: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Item>> {
        let guard = self.read();
        let mut out: Vec<Item> = guard
            .items
            .values()
            .filter(|i| source_ids.contains(&i.source_id))
            .filter(|i| published_after.map_or(true, |cutoff| i.published_at >= cutoff))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(out)
    }
}
