//! Read/write HTTP API (C10): plain JSON REST over `axum`, no GraphQL, no
//! auth middleware — a single-operator local/trusted-network tool.

pub mod error;
pub mod routes;
pub mod state;

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/status", get(routes::status))
        .route("/api/jobs", get(routes::list_jobs))
        .route("/api/jobs/:id", get(routes::get_job))
        .route("/api/jobs/:id/applied", post(routes::mark_applied))
        .route("/api/jobs/:id/dismissed", post(routes::mark_dismissed))
        .route("/api/telegram/callback", post(routes::telegram_callback))
        .route("/api/analytics/sources", get(routes::source_analytics))
        .route("/api/analytics/weekly", get(routes::weekly_analytics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}
