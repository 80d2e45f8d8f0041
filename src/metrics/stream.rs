use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use super::stats::{sort_stats, Direction, Stats};
use crate::handlers::stats::sort_key;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TableQuery {
    pub key: Option<String>,
    #[serde(default)]
    pub order: Direction,
}

fn sorted_table(state: &AppState, query: &TableQuery) -> Vec<Stats> {
    let mut stats = state.registry.get_stats();
    sort_stats(&mut stats, sort_key(state, query.key.as_deref()), query.order);
    stats
}

// ─── GET /api/metrics ────────────────────────────────────────────
/// The stats table as JSON: `?key=<column>&order=asc|desc`.

pub async fn get_metrics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TableQuery>,
) -> Json<Vec<Stats>> {
    Json(sorted_table(&state, &query))
}

// ─── GET /api/metrics/stream ─────────────────────────────────────
/// Server-Sent Events endpoint.
/// Pushes the sorted stats table as JSON on every configured tick.

pub async fn metrics_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TableQuery>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(state.config.stream_interval);

    let stream = IntervalStream::new(interval).map(move |_| {
        let table = sorted_table(&state, &query);
        let json = serde_json::to_string(&table).unwrap_or_default();
        Ok(Event::default().data(json))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
