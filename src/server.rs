use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::metrics::stream;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Stats table ─────────────────────────────────────────
        .route("/stats", get(handlers::stats::stats_csv))
        .route("/api/metrics", get(stream::get_metrics))
        .route("/api/metrics/stream", get(stream::metrics_stream))
        .route("/api/metrics/reset", post(handlers::stats::reset_metrics))
        .route("/api/metrics/:key", get(handlers::stats::get_timer))
        // ── Global switch ───────────────────────────────────────
        .route(
            "/api/measure/enabled",
            get(handlers::stats::get_enabled).post(handlers::stats::set_enabled),
        )
        // ── Synthetic load ──────────────────────────────────────
        .route("/api/load/start", post(handlers::load::start_load))
        .route("/api/load/stop", post(handlers::load::stop_load))
        .route("/api/load/status", get(handlers::load::load_status))
        // ── Time every matched route into the registry ──────────
        .route_layer(axum_mw::from_fn_with_state(
            state.clone(),
            timing::timing_middleware,
        ))
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        .layer(CorsLayer::permissive())
}
