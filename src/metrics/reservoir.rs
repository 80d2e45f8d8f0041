use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ─── Configuration ───────────────────────────────────────────────

/// Samples kept per reservoir. Gives a 99.9% confidence level with a
/// 5% margin of error for a normal distribution.
pub const DEFAULT_SIZE: usize = 1028;

/// Bias towards the last five minutes of samples.
pub const DEFAULT_ALPHA: f64 = 0.015;

/// Priorities grow exponentially with time; rebase them this often.
const RESCALE_THRESHOLD: Duration = Duration::from_secs(60 * 60);

// ─── Heap entry ──────────────────────────────────────────────────

/// A weighted sample. Ordered so that `BinaryHeap` pops the *lowest*
/// priority first, which is the one to evict.
#[derive(Debug, Clone, Copy)]
struct Weighted {
    priority: f64,
    value: u64,
}

impl PartialEq for Weighted {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Weighted {}

impl PartialOrd for Weighted {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Weighted {
    fn cmp(&self, other: &Self) -> Ordering {
        other.priority.total_cmp(&self.priority)
    }
}

// ─── Reservoir ───────────────────────────────────────────────────

/// Exponentially decaying reservoir (forward-decay priority sampling).
///
/// Each sample is assigned priority `e^(alpha * age) / u` with `u` drawn
/// uniformly from `(0, 1]`; the `size` highest priorities are kept. Newer
/// samples therefore dominate, while memory stays bounded regardless of
/// the sample rate.
#[derive(Debug, Clone)]
pub struct Reservoir {
    size: usize,
    alpha: f64,
    count: u64,
    landmark: Instant,
    next_rescale: Instant,
    values: BinaryHeap<Weighted>,
    rng: StdRng,
}

impl Reservoir {
    pub fn new() -> Self {
        Self::with_params(DEFAULT_SIZE, DEFAULT_ALPHA)
    }

    pub fn with_params(size: usize, alpha: f64) -> Self {
        let now = Instant::now();
        let size = size.max(1);
        Self {
            size,
            alpha,
            count: 0,
            landmark: now,
            next_rescale: now + RESCALE_THRESHOLD,
            values: BinaryHeap::with_capacity(size),
            rng: StdRng::from_entropy(),
        }
    }

    /// Total samples ever offered, including the ones evicted.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Samples currently retained.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn update(&mut self, value: u64) {
        self.update_at(value, Instant::now());
    }

    pub fn update_at(&mut self, value: u64, now: Instant) {
        if now >= self.next_rescale {
            self.rescale(now);
        }
        self.count += 1;

        let age = now.saturating_duration_since(self.landmark).as_secs_f64();
        // gen::<f64>() is in [0, 1); flip it so we never divide by zero
        let u = 1.0 - self.rng.gen::<f64>();
        let priority = (self.alpha * age).exp() / u;
        let entry = Weighted { priority, value };

        if self.values.len() < self.size {
            self.values.push(entry);
            return;
        }
        if let Some(mut lowest) = self.values.peek_mut() {
            if lowest.priority < priority {
                *lowest = entry;
            }
        }
    }

    /// Rebase every priority onto a new landmark so they stay finite.
    fn rescale(&mut self, now: Instant) {
        let shift = now.saturating_duration_since(self.landmark).as_secs_f64();
        let factor = (-self.alpha * shift).exp();
        self.landmark = now;
        self.next_rescale = now + RESCALE_THRESHOLD;

        let rescaled: Vec<Weighted> = self
            .values
            .drain()
            .map(|w| Weighted {
                priority: w.priority * factor,
                value: w.value,
            })
            .collect();
        self.values = BinaryHeap::from(rescaled);
    }

    /// Copy the retained values out, sorted ascending.
    pub fn sorted_values(&self) -> Vec<u64> {
        let mut values: Vec<u64> = self.values.iter().map(|w| w.value).collect();
        values.sort_unstable();
        values
    }

    pub fn percentile(&self, q: f64) -> f64 {
        percentile_of_sorted(&self.sorted_values(), q)
    }
}

impl Default for Reservoir {
    fn default() -> Self {
        Self::new()
    }
}

/// Quantile `q` (0.0..=1.0) of an ascending slice, interpolating between
/// neighbours at position `q * (n + 1)`. Returns 0 for an empty slice; a
/// NaN `q` reads as the smallest value.
pub fn percentile_of_sorted(sorted: &[u64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    let pos = q * (n as f64 + 1.0);
    if pos.is_nan() || pos < 1.0 {
        return sorted[0] as f64;
    }
    if pos >= n as f64 {
        return sorted[n - 1] as f64;
    }
    let lower = sorted[pos as usize - 1] as f64;
    let upper = sorted[pos as usize] as f64;
    lower + (pos - pos.floor()) * (upper - lower)
}
