// tests/api_http.rs
//! Router-level checks with `tower::ServiceExt::oneshot`: status codes,
//! not-found mapping, and the structured ingest report.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::Router;
use http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use trendfeed::api::{create_router, AppState};
use trendfeed::heuristics::Heuristics;
use trendfeed::ingest::{providers, IngestLimits, IngestPipeline};
use trendfeed::store::{memory::MemoryStore, ContentStore};
use trendfeed::trend::{TrendAnalyzer, TrendScorer};

fn router() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let limits = IngestLimits::default();
    let client = providers::http_client(limits.http_timeout_secs).unwrap();
    let pipeline = Arc::new(IngestPipeline::new(
        store.clone(),
        providers::default_fetchers(client),
        limits,
    ));
    let trends = Arc::new(TrendAnalyzer::new(
        store.clone(),
        TrendScorer::new(Arc::new(Heuristics::default_seed())),
    ));
    let state = AppState {
        store: store.clone(),
        pipeline,
        trends,
    };
    (create_router(state), store)
}

async fn body_json(body: Body) -> Value {
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, value: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(value.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_responds_ok() {
    let (router, _) = router();
    let resp = router.oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn source_crud_round_trip() {
    let (router, _) = router();
    let user_id = Uuid::new_v4();

    let resp = router
        .clone()
        .oneshot(post_json(
            "/sources",
            json!({
                "user_id": user_id,
                "name": "Example Wire",
                "kind": "rss",
                "locator": "https://example.com/feed.xml"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp.into_body()).await;
    assert_eq!(created["name"], "Example Wire");
    assert_eq!(created["fetch_interval_secs"], 3600);
    let source_id = created["id"].as_str().unwrap().to_string();

    let resp = router
        .clone()
        .oneshot(get(&format!("/sources?user_id={user_id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let listed = body_json(resp.into_body()).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let resp = router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/sources/{source_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = router
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/sources/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ingest_reports_partial_success_for_unknown_source() {
    let (router, _) = router();
    let resp = router
        .oneshot(post_json(
            "/ingest/process",
            json!({ "source_ids": [Uuid::new_v4()], "force_refresh": true }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let report = body_json(resp.into_body()).await;
    assert_eq!(report["processed_sources"], 1);
    assert_eq!(report["new_items"], 0);
    assert_eq!(report["errors"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn trends_endpoints_handle_empty_and_missing() {
    let (router, _) = router();
    let user_id = Uuid::new_v4();

    let resp = router
        .clone()
        .oneshot(get(&format!("/trends/items?user_id={user_id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_json(resp.into_body()).await.as_array().unwrap().is_empty());

    let resp = router
        .clone()
        .oneshot(get(&format!("/trends/items/{}/score", Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = router
        .clone()
        .oneshot(get(&format!("/trends/keywords?user_id={user_id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router
        .clone()
        .oneshot(post_json("/trends/recalculate", json!({ "user_id": user_id })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let report = body_json(resp.into_body()).await;
    assert_eq!(report["items_processed"], 0);

    let resp = router
        .oneshot(get(&format!("/trends/metadata?user_id={user_id}&window_hours=24")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let meta = body_json(resp.into_body()).await;
    assert_eq!(meta["time_window_hours"], 24);
    assert_eq!(meta["total_items_analyzed"], 0);
}

#[tokio::test]
async fn scored_item_round_trips_through_api() {
    let (router, store) = router();
    let user_id = Uuid::new_v4();
    let source = store
        .create_source(trendfeed::model::NewSource {
            user_id,
            name: "Wire".into(),
            kind: trendfeed::model::SourceKind::Rss,
            locator: "https://example.com/feed.xml".into(),
            fetch_interval_secs: 3600,
        })
        .await
        .unwrap();
    let item = store
        .insert_item_if_absent(trendfeed::model::NewItem {
            source_id: source.id,
            title: "Breaking: Something Announces Something".into(),
            url: "https://techcrunch.com/something".into(),
            summary: None,
            published_at: chrono::Utc::now(),
            image_url: None,
        })
        .await
        .unwrap()
        .unwrap();

    let resp = router
        .clone()
        .oneshot(get(&format!("/trends/items/{}/score", item.id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let scored = body_json(resp.into_body()).await;
    let score = scored["trend_score"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&score));

    let resp = router
        .oneshot(get(&format!("/trends/items?user_id={user_id}")))
        .await
        .unwrap();
    let items = body_json(resp.into_body()).await;
    let arr = items.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert!(arr[0]["trend_score"].as_f64().is_some());
}
