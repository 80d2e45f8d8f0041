use std::process::ExitCode;
use std::sync::Arc;

use measure::{config::Config, logging, server, AppState};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    // ── 1. Configuration ─────────────────────────────────────────
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    measure::set_enabled(!config.disabled);

    // ── 2. Build shared state ────────────────────────────────────
    let addr = config.addr;
    let state = Arc::new(AppState::new(config));

    // ── 3. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state);

    // ── 4. Bind & serve ──────────────────────────────────────────
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, "failed to bind: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(%addr, enabled = measure::is_enabled(), "measure server listening");
    info!("stats table     → http://{addr}/stats?key=sum");
    info!("metrics JSON    → http://{addr}/api/metrics");
    info!("metrics SSE     → http://{addr}/api/metrics/stream");

    if let Err(e) = axum::serve(listener, app).await {
        error!("server exited with error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
