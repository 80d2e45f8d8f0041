use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

use crate::AppState;

use super::AppError;

// ─── Request / response types ────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoadConfig {
    /// Number of concurrent Tokio tasks generating load
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// How long the run lasts (seconds)
    #[serde(default = "default_duration")]
    pub duration_secs: u64,

    /// Clear the registry before the run starts
    #[serde(default = "default_reset")]
    pub reset: bool,
}

fn default_concurrency() -> u32 {
    8
}
fn default_duration() -> u64 {
    30
}
fn default_reset() -> bool {
    true
}

impl LoadConfig {
    fn validate(&self) -> Result<(), AppError> {
        if self.concurrency == 0 || self.concurrency > 500 {
            return Err(AppError::BadRequest(
                "concurrency must be between 1 and 500".into(),
            ));
        }
        if self.duration_secs == 0 || self.duration_secs > 300 {
            return Err(AppError::BadRequest(
                "duration_secs must be between 1 and 300".into(),
            ));
        }
        Ok(())
    }
}

/// Identity of one load run.
#[derive(Debug, Clone, Serialize)]
pub struct LoadRun {
    pub run_id: String,
    pub started_at: String,
    pub config: LoadConfig,
}

#[derive(Debug, Serialize)]
pub struct LoadStatus {
    pub running: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<LoadRun>,
}

// ─── POST /api/load/start ────────────────────────────────────────

pub async fn start_load(
    State(state): State<Arc<AppState>>,
    Json(config): Json<LoadConfig>,
) -> Result<Json<LoadStatus>, AppError> {
    // Guard: only one run at a time; claiming the flag is the check
    if state
        .load_running
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(AppError::AlreadyRunning);
    }
    if let Err(e) = config.validate() {
        state.load_running.store(false, Ordering::SeqCst);
        return Err(e);
    }

    if config.reset {
        state.registry.reset();
    }

    let run = LoadRun {
        run_id: format!("run_{}", &uuid::Uuid::new_v4().simple().to_string()[..8]),
        started_at: chrono::Utc::now().to_rfc3339(),
        config: config.clone(),
    };
    info!(
        run_id = %run.run_id,
        concurrency = config.concurrency,
        duration_secs = config.duration_secs,
        "load run started"
    );
    *state.load_run.lock() = Some(run.clone());

    let running = state.load_running.clone();
    let registry = state.registry.clone();

    let handle = tokio::spawn(async move {
        crate::load_generator::run(running, registry, config.concurrency, config.duration_secs)
            .await;
    });

    // Stash the handle so `stop` can await clean shutdown
    let mut guard = state.load_handle.lock().await;
    *guard = Some(handle);

    Ok(Json(LoadStatus {
        running: true,
        message: format!(
            "Started: {} workers × {}s",
            run.config.concurrency, run.config.duration_secs
        ),
        run: Some(run),
    }))
}

// ─── POST /api/load/stop ─────────────────────────────────────────

pub async fn stop_load(State(state): State<Arc<AppState>>) -> Json<LoadStatus> {
    if !state.load_running.load(Ordering::SeqCst) {
        return Json(LoadStatus {
            running: false,
            message: "No load run in progress".into(),
            run: state.load_run.lock().clone(),
        });
    }

    // Signal all workers to stop
    state.load_running.store(false, Ordering::SeqCst);

    // Await the generator task so we know it's fully stopped
    let mut guard = state.load_handle.lock().await;
    if let Some(handle) = guard.take() {
        // Ignore JoinError, the task may have already finished
        let _ = handle.await;
    }
    info!("load run stopped");

    Json(LoadStatus {
        running: false,
        message: "Load run stopped".into(),
        run: state.load_run.lock().clone(),
    })
}

// ─── GET /api/load/status ────────────────────────────────────────

pub async fn load_status(State(state): State<Arc<AppState>>) -> Json<LoadStatus> {
    let running = state.load_running.load(Ordering::SeqCst);
    Json(LoadStatus {
        running,
        message: if running {
            "Load run in progress".into()
        } else {
            "Idle".into()
        },
        run: state.load_run.lock().clone(),
    })
}
