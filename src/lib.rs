//! In-process latency measurement.
//!
//! Mark the start and stop of named operations and read back per-name
//! statistics (count, sum, min, max, mean, 1-minute rate, p95) as a
//! sortable table:
//!
//! ```
//! let registry = measure::Registry::new();
//! let m = registry.start("db.query");
//! // ... work ...
//! m.stop();
//!
//! let mut stats = registry.get_stats();
//! measure::sort_stats(&mut stats, measure::SortKey::Sum, measure::Direction::Desc);
//! print!("{}", measure::write_csv(&stats));
//! ```
//!
//! The free functions ([`start`], [`get_stats`], [`reset`], ...) work on a
//! process-wide default registry. The `server` module exposes a registry
//! over HTTP.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub mod config;
pub mod handlers;
pub mod load_generator;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod server;

pub use metrics::{
    default_registry, get_stats, is_enabled, record, reset, set_enabled, sort_stats, start,
    time, write_csv, Direction, Measure, Registry, SortKey, Stats, StatsSliceExt, Timer,
    TimerSnapshot, CSV_HEADER,
};

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Registry served by the HTTP endpoints and fed by the request middleware.
    pub registry: Arc<Registry>,

    pub config: config::Config,

    /// Flag checked by every load-generator worker on each iteration.
    pub load_running: Arc<AtomicBool>,

    /// Handle to the spawned load-generator task so we can await clean shutdown.
    pub load_handle: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,

    /// Description of the current (or last) load run.
    pub load_run: parking_lot::Mutex<Option<handlers::load::LoadRun>>,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        Self::with_registry(Arc::new(Registry::with_quantile(config.quantile)), config)
    }

    pub fn with_registry(registry: Arc<Registry>, config: config::Config) -> Self {
        Self {
            registry,
            config,
            load_running: Arc::new(AtomicBool::new(false)),
            load_handle: tokio::sync::Mutex::new(None),
            load_run: parking_lot::Mutex::new(None),
        }
    }
}
