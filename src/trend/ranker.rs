// src/trend/ranker.rs
//! Read-path analysis over ingested items: trending top-K, single-item
//! scores, bulk rescoring, keyword trends, and analysis metadata.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::heuristics::count_occurrences;
use crate::model::{AnalysisMetadata, Item, KeywordTrend, RecalcReport, TrendDirection};
use crate::store::{ContentStore, StoreResult};
use crate::trend::scoring::TrendScorer;

pub const ANALYSIS_VERSION: &str = "1.0";

pub struct TrendAnalyzer {
    store: Arc<dyn ContentStore>,
    scorer: TrendScorer,
}

impl TrendAnalyzer {
    pub fn new(store: Arc<dyn ContentStore>, scorer: TrendScorer) -> Self {
        Self { store, scorer }
    }

    pub fn scorer(&self) -> &TrendScorer {
        &self.scorer
    }

    async fn user_source_ids(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(self
            .store
            .list_sources_by_user(user_id)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect())
    }

    /// Top `limit` items from the user's sources published within the window,
    /// sorted by trend score descending; more-recent `published_at` breaks
    /// ties. Every returned item carries a populated `trend_score`.
    pub async fn trending_items(
        &self,
        user_id: Uuid,
        window_hours: i64,
        limit: usize,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Item>> {
        let source_ids = self.user_source_ids(user_id).await?;
        if source_ids.is_empty() {
            return Ok(Vec::new());
        }
        let cutoff = now - Duration::hours(window_hours);
        let mut items = self
            .store
            .list_items_for_sources(&source_ids, Some(cutoff))
            .await?;

        for item in &mut items {
            item.trend_score = Some(self.scorer.score(item, now));
        }
        items.sort_by(|a, b| {
            let sa = a.trend_score.unwrap_or(0.0);
            let sb = b.trend_score.unwrap_or(0.0);
            sb.partial_cmp(&sa)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.published_at.cmp(&a.published_at))
        });
        items.truncate(limit);
        Ok(items)
    }

    /// Score a single item; unknown ids are a not-found error.
    pub async fn item_score(&self, item_id: Uuid, now: DateTime<Utc>) -> StoreResult<f64> {
        let item = self.store.get_item(item_id).await?;
        Ok(self.scorer.score(&item, now))
    }

    /// Rescore every item from the user's sources and persist the results.
    pub async fn recalculate_all(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<RecalcReport> {
        let started = std::time::Instant::now();
        let source_ids = self.user_source_ids(user_id).await?;
        let items = self.store.list_items_for_sources(&source_ids, None).await?;

        let mut processed = 0usize;
        for item in &items {
            let score = self.scorer.score(item, now);
            self.store.update_item_score(item.id, score).await?;
            processed += 1;
        }

        let report = RecalcReport {
            items_processed: processed,
            time_taken_seconds: started.elapsed().as_secs_f64(),
        };
        info!(
            target: "trend",
            user_id = %user_id,
            items = report.items_processed,
            "rescored all items"
        );
        Ok(report)
    }

    /// Keyword frequency over the windowed item set. The direction compares
    /// the recent half of the window against the older half; keywords that
    /// never occur are dropped.
    pub async fn trending_keywords(
        &self,
        user_id: Uuid,
        window_hours: i64,
        limit: usize,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<KeywordTrend>> {
        let source_ids = self.user_source_ids(user_id).await?;
        if source_ids.is_empty() {
            return Ok(Vec::new());
        }
        let cutoff = now - Duration::hours(window_hours);
        let items = self
            .store
            .list_items_for_sources(&source_ids, Some(cutoff))
            .await?;

        let midpoint = now - Duration::minutes(window_hours * 30);
        let texts: Vec<(String, DateTime<Utc>)> = items
            .iter()
            .map(|i| {
                let text = format!("{} {}", i.title, i.summary.as_deref().unwrap_or_default())
                    .to_lowercase();
                (text, i.published_at)
            })
            .collect();

        let mut trends = Vec::new();
        for keyword in &self.scorer.heuristics().topic_keywords {
            let mut recent = 0usize;
            let mut older = 0usize;
            for (text, published_at) in &texts {
                let n = count_occurrences(text, keyword);
                if n == 0 {
                    continue;
                }
                if *published_at >= midpoint {
                    recent += n;
                } else {
                    older += n;
                }
            }
            let frequency = recent + older;
            if frequency == 0 {
                continue;
            }
            let direction = match recent.cmp(&older) {
                Ordering::Greater => TrendDirection::Up,
                Ordering::Less => TrendDirection::Down,
                Ordering::Equal => TrendDirection::Stable,
            };
            trends.push(KeywordTrend {
                keyword: keyword.clone(),
                frequency,
                direction,
            });
        }
        trends.sort_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| a.keyword.cmp(&b.keyword))
        });
        trends.truncate(limit);
        Ok(trends)
    }

    /// Summary statistics for the windowed analysis.
    pub async fn analysis_metadata(
        &self,
        user_id: Uuid,
        window_hours: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<AnalysisMetadata> {
        let source_ids = self.user_source_ids(user_id).await?;
        let cutoff = now - Duration::hours(window_hours);
        let items = self
            .store
            .list_items_for_sources(&source_ids, Some(cutoff))
            .await?;

        let total = items.len();
        let average = if total == 0 {
            0.0
        } else {
            let sum: f64 = items.iter().map(|i| self.scorer.score(i, now)).sum();
            (sum / total as f64 * 1000.0).round() / 1000.0
        };

        Ok(AnalysisMetadata {
            analysis_time: now,
            time_window_hours: window_hours,
            total_items_analyzed: total,
            average_trend_score: average,
            analysis_version: ANALYSIS_VERSION,
        })
    }
}
