pub mod error;
pub mod logging;
mod routes;

use std::{sync::Arc, time::Instant};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use legal_core::pipeline::Pipeline;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::logging::LogRing;

// ── AppState ──────────────────────────────────────────────────────────────

pub struct AppState {
    pub pipeline: Pipeline,
    pub start_time: Instant,
    pub log_tx: broadcast::Sender<String>,
    pub log_ring: LogRing,
}

impl AppState {
    pub fn new(pipeline: Pipeline, log_tx: broadcast::Sender<String>, log_ring: LogRing) -> Self {
        Self {
            pipeline,
            start_time: Instant::now(),
            log_tx,
            log_ring,
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────────

pub fn app(state: Arc<AppState>) -> Router {
    let max_upload = state.pipeline.config().max_upload_bytes;

    Router::new()
        .route("/health", get(routes::health))
        // Document operations
        .route("/summary", post(routes::summary))
        .route("/clauses", post(routes::clauses))
        .route("/qa", post(routes::qa))
        .route("/jargon", post(routes::jargon))
        .route("/preview", post(routes::preview))
        // SSE logs
        .route("/api/logs", get(routes::sse_logs))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
