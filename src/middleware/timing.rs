use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::AppState;

/// Route-level middleware that times every matched request into the
/// app's registry under `"<METHOD> <route>"`, e.g. `GET /stats`.
///
/// Also adds two response headers:
///
///   X-Response-Time-Us  : handler wall time in microseconds
///   Server-Timing       : same value in the standard Server-Timing format
///
/// The SSE stream is passed through untimed; it only ends when the client
/// disconnects.
pub async fn timing_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    // The route template keeps the key space bounded
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    if route.ends_with("/stream") {
        return next.run(req).await;
    }

    let key = format!("{} {}", req.method(), route);
    let m = state.registry.start(&key);
    let mut response = next.run(req).await;
    let elapsed = m.elapsed();
    m.stop();

    let Some(elapsed) = elapsed else {
        return response;
    };
    let us = elapsed.as_micros() as u64;

    // ── Inject response headers ─────────────────────────────────
    if let Ok(val) = us.to_string().parse() {
        response.headers_mut().insert("x-response-time-us", val);
    }

    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("server-timing", val);
    }

    debug!(status = response.status().as_u16(), %key, us, "request timed");

    response
}
