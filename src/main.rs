//! Trendfeed — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the ingestion pipeline, trend analyzer,
//! store, and middleware.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trendfeed::api::{self, AppState};
use trendfeed::heuristics::Heuristics;
use trendfeed::ingest::{providers, IngestLimits, IngestPipeline};
use trendfeed::metrics::Metrics;
use trendfeed::store::{memory::MemoryStore, ContentStore};
use trendfeed::trend::{TrendAnalyzer, TrendScorer};

/// Compact tracing output; `RUST_LOG` overrides the default filter.
/// `try_init` keeps us from fighting a subscriber the host runtime installed.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trendfeed=info,ingest=info,trend=info,warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let heuristics = Arc::new(Heuristics::load_default());
    let limits = IngestLimits::load_default();
    let client = providers::http_client(limits.http_timeout_secs).expect("building http client");

    let store: Arc<dyn ContentStore> = Arc::new(MemoryStore::new());
    let pipeline = Arc::new(IngestPipeline::new(
        store.clone(),
        providers::default_fetchers(client),
        limits,
    ));
    let trends = Arc::new(TrendAnalyzer::new(
        store.clone(),
        TrendScorer::new(heuristics),
    ));

    let metrics = Metrics::init();
    let state = AppState {
        store,
        pipeline,
        trends,
    };
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
