use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use super::ewma::Meter;
use super::reservoir::{percentile_of_sorted, Reservoir};
use super::NANOS_PER_MILLI;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe accumulator for one named operation.
/// The registry calls `update()`, the read path calls `snapshot()`.
#[derive(Debug)]
pub struct Timer {
    inner: Mutex<Inner>,
}

/// Everything a [`Timer`] knows at one point in time.
/// Durations are in milliseconds, rates in samples per second.
#[derive(Debug, Clone, Serialize)]
pub struct TimerSnapshot {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,

    pub rate1: f64,
    pub rate5: f64,
    pub rate15: f64,
    pub rate_mean: f64,

    /// Value at the timer's configured quantile (0.95 unless overridden).
    pub quantile: f64,
    pub p50: f64,
    pub p75: f64,
    pub p99: f64,
    pub p999: f64,
}

// ─── Internal state ──────────────────────────────────────────────

#[derive(Debug)]
struct Inner {
    count: u64,
    sum_ns: u64,
    min_ns: u64,
    max_ns: u64,

    // Welford running variance, in nanoseconds
    mean_ns: f64,
    m2: f64,

    meter: Meter,
    reservoir: Reservoir,
    quantile: f64,
}

// ─── Timer impl ──────────────────────────────────────────────────

impl Timer {
    pub fn new() -> Self {
        Self::with_quantile(0.95)
    }

    /// A timer whose headline quantile is `q` (clamped to `0.0..=1.0`).
    pub fn with_quantile(q: f64) -> Self {
        Self {
            inner: Mutex::new(Inner::new(q)),
        }
    }

    /// Record one observation.
    pub fn update(&self, elapsed: Duration) {
        self.inner.lock().update(elapsed, Instant::now());
    }

    /// Record the time elapsed since `start`.
    pub fn update_since(&self, start: Instant) {
        self.update(start.elapsed());
    }

    pub fn count(&self) -> u64 {
        self.inner.lock().count
    }

    /// Produce a read-only snapshot. Ticks the rate estimators as a side
    /// effect, so idle timers decay.
    pub fn snapshot(&self) -> TimerSnapshot {
        self.inner.lock().snapshot(Instant::now())
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

/// Bring a requested quantile into `0.0..=1.0`; NaN means the default 0.95.
pub(crate) fn clamp_quantile(q: f64) -> f64 {
    if q.is_nan() {
        0.95
    } else {
        q.clamp(0.0, 1.0)
    }
}

impl Inner {
    fn new(quantile: f64) -> Self {
        let quantile = clamp_quantile(quantile);
        Self {
            count: 0,
            sum_ns: 0,
            min_ns: 0,
            max_ns: 0,
            mean_ns: 0.0,
            m2: 0.0,
            meter: Meter::new(),
            reservoir: Reservoir::new(),
            quantile,
        }
    }

    fn update(&mut self, elapsed: Duration, now: Instant) {
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);

        // First sample sets both bounds
        if self.count == 0 {
            self.min_ns = ns;
            self.max_ns = ns;
        } else {
            self.min_ns = self.min_ns.min(ns);
            self.max_ns = self.max_ns.max(ns);
        }

        self.count += 1;
        self.sum_ns = self.sum_ns.saturating_add(ns);

        let delta = ns as f64 - self.mean_ns;
        self.mean_ns += delta / self.count as f64;
        self.m2 += delta * (ns as f64 - self.mean_ns);

        self.meter.mark_at(1, now);
        self.reservoir.update_at(ns, now);
    }

    fn snapshot(&mut self, now: Instant) -> TimerSnapshot {
        let rates = self.meter.rates_at(now);
        let sorted = self.reservoir.sorted_values();
        let pct = |q: f64| percentile_of_sorted(&sorted, q) / NANOS_PER_MILLI;

        let (mean, stddev) = if self.count == 0 {
            (0.0, 0.0)
        } else {
            let variance = if self.count > 1 {
                self.m2 / (self.count - 1) as f64
            } else {
                0.0
            };
            (
                self.sum_ns as f64 / self.count as f64 / NANOS_PER_MILLI,
                variance.sqrt() / NANOS_PER_MILLI,
            )
        };

        TimerSnapshot {
            count: self.count,
            sum: self.sum_ns as f64 / NANOS_PER_MILLI,
            min: self.min_ns as f64 / NANOS_PER_MILLI,
            max: self.max_ns as f64 / NANOS_PER_MILLI,
            mean,
            stddev,

            rate1: rates.rate1,
            rate5: rates.rate5,
            rate15: rates.rate15,
            rate_mean: rates.rate_mean,

            quantile: pct(self.quantile),
            p50: pct(0.5),
            p75: pct(0.75),
            p99: pct(0.99),
            p999: pct(0.999),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn empty_timer_snapshot_is_zeroed() {
        let s = Timer::new().snapshot();
        assert_eq!(s.count, 0);
        assert_eq!(s.mean, 0.0);
        assert_eq!(s.min, 0.0);
        assert_eq!(s.quantile, 0.0);
    }

    #[test]
    fn single_sample_sets_every_bound() {
        let t = Timer::new();
        t.update(ms(4));
        let s = t.snapshot();
        assert_eq!(s.count, 1);
        assert_eq!(s.sum, 4.0);
        assert_eq!(s.min, 4.0);
        assert_eq!(s.max, 4.0);
        assert_eq!(s.mean, 4.0);
        assert_eq!(s.quantile, 4.0);
        assert_eq!(s.stddev, 0.0);
    }

    #[test]
    fn aggregates_hold_their_invariants() {
        let t = Timer::new();
        for n in [3, 1, 8, 2, 5] {
            t.update(ms(n));
        }
        let s = t.snapshot();
        assert_eq!(s.count, 5);
        assert_eq!(s.sum, 19.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 8.0);
        assert!(s.min <= s.mean && s.mean <= s.max);
        assert!(s.sum >= s.max);
        assert!(s.p50 <= s.quantile && s.quantile <= s.max);
    }

    #[test]
    fn custom_quantile_is_clamped() {
        let t = Timer::with_quantile(7.0);
        for n in 1..=10 {
            t.update(ms(n));
        }
        assert_eq!(t.snapshot().quantile, 10.0);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let t = Arc::new(Timer::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let t = Arc::clone(&t);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        t.update(Duration::from_micros(10));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let s = t.snapshot();
        assert_eq!(s.count, 8_000);
        assert!((s.sum - 80.0).abs() < 1e-9);
    }
}
