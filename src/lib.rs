// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod heuristics;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod store;
pub mod trend;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::heuristics::Heuristics;
pub use crate::ingest::{IngestLimits, IngestPipeline};
pub use crate::model::{Item, ProcessReport, Source, SourceKind};
pub use crate::store::{memory::MemoryStore, ContentStore, StoreError};
pub use crate::trend::{TrendAnalyzer, TrendScorer};
