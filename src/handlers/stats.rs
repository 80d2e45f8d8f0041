use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::metrics::{self, sort_stats, Direction, SortKey, TimerSnapshot};
use crate::AppState;

use super::AppError;

// ─── Request / response types ────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct SortQuery {
    /// Column to sort by; unknown names sort by `sum`.
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub discarded: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnabledState {
    pub enabled: bool,
}

/// Resolve the requested column, falling back to the configured default
/// only when the parameter is absent.
pub(crate) fn sort_key(state: &AppState, requested: Option<&str>) -> SortKey {
    requested.map_or(state.config.default_sort, SortKey::parse)
}

// ─── GET /stats ──────────────────────────────────────────────────
/// The stats table as CSV, sorted descending by `?key=`.

pub async fn stats_csv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SortQuery>,
) -> impl IntoResponse {
    let key = sort_key(&state, query.key.as_deref());

    let mut stats = state.registry.get_stats();
    sort_stats(&mut stats, key, Direction::Desc);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        metrics::write_csv(&stats),
    )
}

// ─── GET /api/metrics/:key ───────────────────────────────────────
/// Full snapshot of one timer. Keys containing `/` arrive percent-encoded.

pub async fn get_timer(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<TimerSnapshot>, AppError> {
    state
        .registry
        .get(&key)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no timer named '{key}'")))
}

// ─── POST /api/metrics/reset ─────────────────────────────────────

pub async fn reset_metrics(State(state): State<Arc<AppState>>) -> Json<ResetResponse> {
    let discarded = state.registry.len();
    state.registry.reset();
    info!(discarded, "metrics reset");
    Json(ResetResponse { discarded })
}

// ─── GET|POST /api/measure/enabled ───────────────────────────────

pub async fn get_enabled() -> Json<EnabledState> {
    Json(EnabledState {
        enabled: metrics::is_enabled(),
    })
}

pub async fn set_enabled(Json(body): Json<EnabledState>) -> Json<EnabledState> {
    metrics::set_enabled(body.enabled);
    info!(enabled = body.enabled, "measurement switch toggled");
    Json(body)
}
