//! HTTP surface.

use crate::metrics;
use crate::query::{StatsService, StatsView};
use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub stats: StatsService,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn stats_handler(State(state): State<AppState>) -> Json<StatsView> {
    Json(state.stats.get_stats())
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn metrics_handler() -> Result<String, StatusCode> {
    metrics::render().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
