use std::time::{Duration, Instant};

// ─── Configuration ───────────────────────────────────────────────

/// Rates are recomputed once per tick.
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

const TICK_SECS: f64 = 5.0;

/// Past this many missed ticks every rate has decayed to (numerically) zero.
const MAX_CATCH_UP_TICKS: u64 = 10_000;

// ─── Ewma ────────────────────────────────────────────────────────

/// Exponentially weighted moving rate, in events per second.
///
/// Not thread-safe on its own; the owning [`Meter`] lives behind the
/// timer's mutex.
#[derive(Debug, Clone)]
pub struct Ewma {
    alpha: f64,
    rate: f64,
    uncounted: u64,
    initialized: bool,
}

impl Ewma {
    /// Build an EWMA whose weight corresponds to a window of `minutes`.
    pub fn with_window(minutes: f64) -> Self {
        Self::with_alpha(1.0 - (-TICK_SECS / 60.0 / minutes).exp())
    }

    pub fn with_alpha(alpha: f64) -> Self {
        Self {
            alpha,
            rate: 0.0,
            uncounted: 0,
            initialized: false,
        }
    }

    pub fn one_minute() -> Self {
        Self::with_window(1.0)
    }

    pub fn five_minute() -> Self {
        Self::with_window(5.0)
    }

    pub fn fifteen_minute() -> Self {
        Self::with_window(15.0)
    }

    pub fn update(&mut self, n: u64) {
        self.uncounted = self.uncounted.saturating_add(n);
    }

    /// Fold the events seen since the last tick into the rate.
    pub fn tick(&mut self) {
        let instant_rate = self.uncounted as f64 / TICK_SECS;
        self.uncounted = 0;
        if self.initialized {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.initialized = true;
        }
    }

    /// Events per second as of the last tick.
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

// ─── Meter ───────────────────────────────────────────────────────

/// A snapshot of every rate a [`Meter`] tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rates {
    pub rate1: f64,
    pub rate5: f64,
    pub rate15: f64,
    pub rate_mean: f64,
}

/// 1, 5 and 15 minute EWMAs plus the lifetime mean rate.
///
/// Ticks are applied lazily: every `mark` and `rates` call first catches
/// up on the tick intervals that have elapsed, so a meter that stops
/// receiving events still decays towards zero.
#[derive(Debug, Clone)]
pub struct Meter {
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
    count: u64,
    started: Instant,
    last_tick: Instant,
}

impl Meter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            m1: Ewma::one_minute(),
            m5: Ewma::five_minute(),
            m15: Ewma::fifteen_minute(),
            count: 0,
            started: now,
            last_tick: now,
        }
    }

    pub fn mark(&mut self, n: u64) {
        self.mark_at(n, Instant::now());
    }

    pub fn mark_at(&mut self, n: u64, now: Instant) {
        self.tick_if_needed(now);
        self.count = self.count.saturating_add(n);
        self.m1.update(n);
        self.m5.update(n);
        self.m15.update(n);
    }

    pub fn rates(&mut self) -> Rates {
        self.rates_at(Instant::now())
    }

    pub fn rates_at(&mut self, now: Instant) -> Rates {
        self.tick_if_needed(now);
        let elapsed = now.saturating_duration_since(self.started).as_secs_f64();
        let rate_mean = if elapsed > 0.0 {
            self.count as f64 / elapsed
        } else {
            0.0
        };
        Rates {
            rate1: self.m1.rate(),
            rate5: self.m5.rate(),
            rate15: self.m15.rate(),
            rate_mean,
        }
    }

    fn tick_if_needed(&mut self, now: Instant) {
        let since = now.saturating_duration_since(self.last_tick);
        let ticks = (since.as_nanos() / TICK_INTERVAL.as_nanos()) as u64;
        if ticks == 0 {
            return;
        }
        self.last_tick += TICK_INTERVAL * ticks.min(u32::MAX as u64) as u32;

        for _ in 0..ticks.min(MAX_CATCH_UP_TICKS) {
            self.m1.tick();
            self.m5.tick();
            self.m15.tick();
        }
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_seeds_instant_rate() {
        let mut e = Ewma::one_minute();
        e.update(10);
        e.tick();
        assert!((e.rate() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn rate_decays_without_events() {
        let mut e = Ewma::one_minute();
        e.update(300);
        e.tick();
        let seeded = e.rate();
        for _ in 0..12 {
            e.tick();
        }
        // one minute of silence leaves roughly e^-1 of the rate
        let expected = seeded * (-1.0f64).exp();
        assert!((e.rate() - expected).abs() < 1e-6, "{} vs {}", e.rate(), expected);
    }

    #[test]
    fn meter_ticks_lazily() {
        let t0 = Instant::now();
        let mut m = Meter::starting_at(t0);
        m.mark_at(50, t0);

        let before = m.rates_at(t0 + Duration::from_secs(1));
        assert_eq!(before.rate1, 0.0);

        let after = m.rates_at(t0 + Duration::from_secs(6));
        assert!((after.rate1 - 10.0).abs() < 1e-9);
        assert!(after.rate_mean > 0.0);

        let later = m.rates_at(t0 + Duration::from_secs(6 + 300));
        assert!(later.rate1 < after.rate1);
        assert!(later.rate15 > later.rate1);
    }
}
