use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::metrics::Registry;

/// Synthetic operations a worker picks from, with their relative weights.
const OPERATIONS: &[(&str, u32)] = &[
    ("cache.lookup", 50),
    ("db.query", 25),
    ("render.page", 15),
    ("upstream.call", 10),
];

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `concurrency` Tokio tasks that time synthetic work against
/// `registry` until the deadline or the `running` flag is cleared.
pub async fn run(
    running: Arc<AtomicBool>,
    registry: Arc<Registry>,
    concurrency: u32,
    duration_secs: u64,
) {
    let deadline = Instant::now() + Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(concurrency as usize);

    for worker_id in 0..concurrency {
        let running = running.clone();
        let registry = registry.clone();

        handles.push(tokio::spawn(async move {
            worker(worker_id, running, registry, deadline).await;
        }));
    }

    // Wait for all workers to finish
    for h in handles {
        let _ = h.await;
    }

    // Mark the run as finished
    running.store(false, Ordering::SeqCst);
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(id: u32, running: Arc<AtomicBool>, registry: Arc<Registry>, deadline: Instant) {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(1000 + id as u64);
    let mut iterations = 0u64;

    while running.load(Ordering::Relaxed) && Instant::now() < deadline {
        let op = pick_operation(&mut rng);
        let m = registry.start(op);
        simulate(op, &mut rng).await;
        m.stop();
        iterations += 1;
    }

    debug!(worker = id, iterations, "load worker finished");
}

fn pick_operation(rng: &mut StdRng) -> &'static str {
    let total: u32 = OPERATIONS.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total);
    for &(name, weight) in OPERATIONS {
        if roll < weight {
            return name;
        }
        roll -= weight;
    }
    OPERATIONS[0].0
}

/// Stand-in for real work: a jittered sleep shaped per operation, with an
/// occasional slow outlier so the p95 column has something to show.
async fn simulate(op: &str, rng: &mut StdRng) {
    let (lo_us, hi_us) = match op {
        "cache.lookup" => (50, 400),
        "db.query" => (1_000, 8_000),
        "render.page" => (2_000, 15_000),
        _ => (5_000, 40_000),
    };
    let mut us = rng.gen_range(lo_us..=hi_us);
    if rng.gen_bool(0.03) {
        us *= 5;
    }
    tokio::time::sleep(Duration::from_micros(us)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_only_known_operations() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let op = pick_operation(&mut rng);
            assert!(OPERATIONS.iter().any(|(name, _)| *name == op));
        }
    }

    #[tokio::test]
    async fn short_run_records_samples() {
        let registry = Arc::new(Registry::new());
        let running = Arc::new(AtomicBool::new(true));
        run(running.clone(), registry.clone(), 2, 1).await;

        assert!(!running.load(Ordering::SeqCst));
        let total: u64 = registry.get_stats().iter().map(|s| s.count).sum();
        assert!(total > 0);
    }
}
