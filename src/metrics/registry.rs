use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

use super::stats::Stats;
use super::timer::{clamp_quantile, Timer, TimerSnapshot};

/// Process-wide switch checked by every `start`. Cleared means disabled.
static ENABLED: AtomicBool = AtomicBool::new(true);

/// Turn measurement on or off for handles started from now on.
/// Handles already running keep the mode they were started in.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

// ─── Registry ────────────────────────────────────────────────────

/// Concurrent map of operation name → [`Timer`].
///
/// Timers are created on their first sample. Lookups take the read lock;
/// only a miss escalates to the write lock, and the sample itself is
/// recorded after every map lock has been released.
#[derive(Debug)]
pub struct Registry {
    timers: RwLock<HashMap<String, Arc<Timer>>>,
    quantile: f64,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_quantile(0.95)
    }

    /// A registry whose `p95` column reports quantile `q` instead.
    /// `q` is clamped to `0.0..=1.0`; NaN falls back to 0.95.
    pub fn with_quantile(q: f64) -> Self {
        Self {
            timers: RwLock::new(HashMap::new()),
            quantile: clamp_quantile(q),
        }
    }

    pub fn quantile(&self) -> f64 {
        self.quantile
    }

    /// Begin timing `key`. Free when measurement is disabled.
    pub fn start<'a>(&'a self, key: &'a str) -> Measure<'a> {
        if !is_enabled() {
            return Measure::inactive();
        }
        Measure {
            active: Some(Active {
                key,
                start: Instant::now(),
                registry: self,
            }),
        }
    }

    /// Record the time elapsed since `start` against `key`.
    pub fn update(&self, key: &str, start: Instant) {
        let elapsed = start.elapsed();
        self.timer(key).update(elapsed);
    }

    /// Record an externally measured duration against `key`.
    /// Honours the global switch like `start` does.
    pub fn record(&self, key: &str, elapsed: Duration) {
        if !is_enabled() {
            return;
        }
        self.timer(key).update(elapsed);
    }

    /// Time `f` under `key` and hand back its result.
    pub fn time<T>(&self, key: &str, f: impl FnOnce() -> T) -> T {
        let m = self.start(key);
        let out = f();
        m.stop();
        out
    }

    /// Fetch the timer for `key`, creating it on first use.
    fn timer(&self, key: &str) -> Arc<Timer> {
        if let Some(t) = self.timers.read().get(key) {
            return Arc::clone(t);
        }

        // Another thread may have inserted it between the two locks
        let mut timers = self.timers.write();
        let t = timers.entry(key.to_owned()).or_insert_with(|| {
            debug!(key, "creating timer");
            Arc::new(Timer::with_quantile(self.quantile))
        });
        Arc::clone(t)
    }

    /// One stats row per timer, in no particular order.
    pub fn get_stats(&self) -> Vec<Stats> {
        self.entries()
            .into_iter()
            .map(|(key, t)| {
                let snap = t.snapshot();
                Stats::from_snapshot(key, &snap)
            })
            .collect()
    }

    /// Full snapshot of a single timer, if it exists.
    pub fn get(&self, key: &str) -> Option<TimerSnapshot> {
        let t = self.timers.read().get(key).cloned()?;
        Some(t.snapshot())
    }

    pub fn keys(&self) -> Vec<String> {
        self.timers.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.timers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.read().is_empty()
    }

    /// Drop every timer. Handles started earlier still record, into the
    /// fresh generation.
    pub fn reset(&self) {
        let old = std::mem::take(&mut *self.timers.write());
        debug!(discarded = old.len(), "registry reset");
    }

    // Copy the pairs out so snapshots never run under the map lock
    fn entries(&self) -> Vec<(String, Arc<Timer>)> {
        self.timers
            .read()
            .iter()
            .map(|(k, t)| (k.clone(), Arc::clone(t)))
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Measurement handle ──────────────────────────────────────────

/// One in-flight timed operation, produced by [`Registry::start`].
///
/// `stop` consumes the handle, so a measurement is recorded at most once.
/// Dropping it without stopping records nothing.
#[must_use = "a measurement records nothing until `stop` is called"]
#[derive(Debug)]
pub struct Measure<'a> {
    active: Option<Active<'a>>,
}

#[derive(Debug)]
struct Active<'a> {
    key: &'a str,
    start: Instant,
    registry: &'a Registry,
}

impl<'a> Measure<'a> {
    /// A handle that does nothing on stop.
    pub const fn inactive() -> Self {
        Self { active: None }
    }

    /// Whether this handle will record a sample when stopped.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn key(&self) -> Option<&'a str> {
        self.active.as_ref().map(|a| a.key)
    }

    /// Time since `start`, or `None` for an inactive handle.
    pub fn elapsed(&self) -> Option<Duration> {
        self.active.as_ref().map(|a| a.start.elapsed())
    }

    pub fn stop(self) {
        if let Some(a) = self.active {
            a.registry.update(a.key, a.start);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_creates_the_timer() {
        let r = Registry::new();
        assert!(r.is_empty());
        r.record("op", Duration::from_millis(2));
        assert_eq!(r.len(), 1);
        assert_eq!(r.get("op").map(|s| s.count), Some(1));
        assert!(r.get("missing").is_none());
    }

    #[test]
    fn same_key_reuses_one_timer() {
        let r = Registry::new();
        for _ in 0..5 {
            r.record("op", Duration::from_micros(5));
        }
        assert_eq!(r.keys(), vec!["op".to_string()]);
        assert_eq!(r.get("op").map(|s| s.count), Some(5));
    }

    #[test]
    fn time_returns_closure_result() {
        let r = Registry::new();
        let out = r.time("calc", || 6 * 7);
        assert_eq!(out, 42);
    }

    #[test]
    fn inactive_handle_is_a_no_op() {
        let m = Measure::inactive();
        assert!(!m.is_active());
        assert!(m.elapsed().is_none());
        assert!(m.key().is_none());
        m.stop();
    }

    #[test]
    fn custom_quantile_flows_into_stats() {
        let r = Registry::with_quantile(0.0);
        for n in 1..=20 {
            r.record("q", Duration::from_millis(n));
        }
        let stats = r.get_stats();
        assert_eq!(stats[0].p95, 1.0);
        assert_eq!(r.quantile(), 0.0);
    }

    #[test]
    fn reported_quantile_matches_what_timers_use() {
        let r = Registry::with_quantile(7.0);
        assert_eq!(r.quantile(), 1.0);
        for n in 1..=10 {
            r.record("q", Duration::from_millis(n));
        }
        assert_eq!(r.get_stats()[0].p95, 10.0);

        assert_eq!(Registry::with_quantile(-1.0).quantile(), 0.0);
        assert_eq!(Registry::with_quantile(f64::NAN).quantile(), 0.95);
    }

    #[test]
    fn reset_empties_and_recreates() {
        let r = Registry::new();
        r.record("a", Duration::from_millis(1));
        r.record("b", Duration::from_millis(1));
        r.reset();
        assert!(r.get_stats().is_empty());
        r.record("a", Duration::from_millis(1));
        assert_eq!(r.get("a").map(|s| s.count), Some(1));
    }
}
