// src/api.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::ingest::IngestPipeline;
use crate::model::{
    AnalysisMetadata, Item, KeywordTrend, NewSource, ProcessReport, RecalcReport, Source,
};
use crate::store::{ContentStore, StoreError};
use crate::trend::TrendAnalyzer;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub pipeline: Arc<IngestPipeline>,
    pub trends: Arc<TrendAnalyzer>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/ingest/process", post(process_feeds))
        .route("/sources", get(list_sources).post(create_source))
        .route("/sources/{id}", delete(delete_source))
        .route("/trends/items", get(trending_items))
        .route("/trends/items/{id}/score", get(item_score))
        .route("/trends/recalculate", post(recalculate))
        .route("/trends/keywords", get(trending_keywords))
        .route("/trends/metadata", get(analysis_metadata))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Store errors mapped onto HTTP statuses: not-found → 404, backend → 500.
struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StoreError::SourceNotFound(_) | StoreError::ItemNotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

#[derive(serde::Deserialize)]
struct ProcessFeedsReq {
    source_ids: Vec<Uuid>,
    #[serde(default)]
    force_refresh: bool,
}

async fn process_feeds(
    State(state): State<AppState>,
    Json(req): Json<ProcessFeedsReq>,
) -> Json<ProcessReport> {
    let cancel = CancellationToken::new();
    let report = state
        .pipeline
        .process_feeds(&req.source_ids, req.force_refresh, &cancel)
        .await;
    Json(report)
}

#[derive(serde::Deserialize)]
struct UserQuery {
    user_id: Uuid,
}

async fn list_sources(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> Result<Json<Vec<Source>>, ApiError> {
    Ok(Json(state.store.list_sources_by_user(q.user_id).await?))
}

async fn create_source(
    State(state): State<AppState>,
    Json(body): Json<NewSource>,
) -> Result<(StatusCode, Json<Source>), ApiError> {
    let created = state.store.create_source(body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_source(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_source(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(serde::Deserialize)]
struct TrendingQuery {
    user_id: Uuid,
    #[serde(default = "default_window_hours")]
    window_hours: i64,
    #[serde(default = "default_item_limit")]
    limit: usize,
}

fn default_window_hours() -> i64 {
    48
}
fn default_item_limit() -> usize {
    20
}
fn default_keyword_limit() -> usize {
    10
}

async fn trending_items(
    State(state): State<AppState>,
    Query(q): Query<TrendingQuery>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let items = state
        .trends
        .trending_items(q.user_id, q.window_hours, q.limit, Utc::now())
        .await?;
    Ok(Json(items))
}

#[derive(serde::Serialize)]
struct ItemScoreResp {
    item_id: Uuid,
    trend_score: f64,
}

async fn item_score(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemScoreResp>, ApiError> {
    let trend_score = state.trends.item_score(id, Utc::now()).await?;
    Ok(Json(ItemScoreResp {
        item_id: id,
        trend_score,
    }))
}

#[derive(serde::Deserialize)]
struct RecalculateReq {
    user_id: Uuid,
}

async fn recalculate(
    State(state): State<AppState>,
    Json(req): Json<RecalculateReq>,
) -> Result<Json<RecalcReport>, ApiError> {
    let report = state.trends.recalculate_all(req.user_id, Utc::now()).await?;
    Ok(Json(report))
}

#[derive(serde::Deserialize)]
struct KeywordQuery {
    user_id: Uuid,
    #[serde(default = "default_window_hours")]
    window_hours: i64,
    #[serde(default = "default_keyword_limit")]
    limit: usize,
}

async fn trending_keywords(
    State(state): State<AppState>,
    Query(q): Query<KeywordQuery>,
) -> Result<Json<Vec<KeywordTrend>>, ApiError> {
    let keywords = state
        .trends
        .trending_keywords(q.user_id, q.window_hours, q.limit, Utc::now())
        .await?;
    Ok(Json(keywords))
}

#[derive(serde::Deserialize)]
struct MetadataQuery {
    user_id: Uuid,
    #[serde(default = "default_window_hours")]
    window_hours: i64,
}

async fn analysis_metadata(
    State(state): State<AppState>,
    Query(q): Query<MetadataQuery>,
) -> Result<Json<AnalysisMetadata>, ApiError> {
    let meta = state
        .trends
        .analysis_metadata(q.user_id, q.window_hours, Utc::now())
        .await?;
    Ok(Json(meta))
}
