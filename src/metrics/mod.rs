pub mod ewma;
pub mod registry;
pub mod reservoir;
pub mod stats;
pub mod stream;
pub mod timer;

use std::sync::LazyLock;
use std::time::Duration;

pub use registry::{is_enabled, set_enabled, Measure, Registry};
pub use stats::{sort_stats, write_csv, Direction, SortKey, Stats, StatsSliceExt, CSV_HEADER};
pub use timer::{Timer, TimerSnapshot};

pub(crate) const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// Zero-configuration registry behind the free functions below.
static DEFAULT_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// The process-wide registry.
pub fn default_registry() -> &'static Registry {
    &DEFAULT_REGISTRY
}

/// Begin timing `key` on the default registry.
///
/// ```
/// let m = measure::start("load_config");
/// // ... work ...
/// m.stop();
/// ```
pub fn start(key: &str) -> Measure<'_> {
    DEFAULT_REGISTRY.start(key)
}

pub fn record(key: &str, elapsed: Duration) {
    DEFAULT_REGISTRY.record(key, elapsed);
}

pub fn time<T>(key: &str, f: impl FnOnce() -> T) -> T {
    DEFAULT_REGISTRY.time(key, f)
}

pub fn get_stats() -> Vec<Stats> {
    DEFAULT_REGISTRY.get_stats()
}

pub fn reset() {
    DEFAULT_REGISTRY.reset();
}
