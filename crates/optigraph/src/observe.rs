//! Progress and telemetry hooks.
//!
//! Search code reports events through an injected [`Observer`]; nothing in the
//! crate keeps process-wide counters. [`Counters`] is the stock implementation:
//! atomic counts plus a percentage log line every 2% of the work units.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::info;

/// Receives search events. Called concurrently from worker threads.
pub trait Observer: Send + Sync {
    /// A complete edge assignment was produced.
    fn on_generated(&self) {}
    /// A topology passed the sift.
    fn on_sifted(&self) {}
    /// A new best deviation was recorded.
    fn on_improved(&self, _deviation: f64) {}
    /// One unit of scheduled work (template or batch line) finished.
    fn on_unit_done(&self) {}
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

const REPORTS: u64 = 50;

#[derive(Debug, Default)]
pub struct Counters {
    generated: AtomicU64,
    sifted: AtomicU64,
    improved: AtomicU64,
    units_done: AtomicU64,
    units_total: u64,
}

/// Point-in-time copy of [`Counters`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub generated: u64,
    pub sifted: u64,
    pub improved: u64,
    pub units_done: u64,
    pub units_total: u64,
}

impl Counters {
    /// `units_total` is the denominator of the progress percentage; 0 disables it.
    pub fn new(units_total: u64) -> Self {
        Self {
            units_total,
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            generated: self.generated.load(Ordering::Relaxed),
            sifted: self.sifted.load(Ordering::Relaxed),
            improved: self.improved.load(Ordering::Relaxed),
            units_done: self.units_done.load(Ordering::Relaxed),
            units_total: self.units_total,
        }
    }
}

impl Observer for Counters {
    fn on_generated(&self) {
        self.generated.fetch_add(1, Ordering::Relaxed);
    }

    fn on_sifted(&self) {
        self.sifted.fetch_add(1, Ordering::Relaxed);
    }

    fn on_improved(&self, _deviation: f64) {
        self.improved.fetch_add(1, Ordering::Relaxed);
    }

    fn on_unit_done(&self) {
        let done = self.units_done.fetch_add(1, Ordering::Relaxed) + 1;
        if self.units_total == 0 {
            return;
        }
        let every = (self.units_total / REPORTS).max(1);
        if done % every == 0 || done == self.units_total {
            let percent = (100 * done / self.units_total).min(100);
            info!(percent, done, total = self.units_total, "progress");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn counters_are_shared_across_threads() {
        let c = Counters::new(400);
        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..100 {
                        c.on_generated();
                        c.on_unit_done();
                    }
                    c.on_sifted();
                });
            }
        });
        let snap = c.snapshot();
        assert_eq!(snap.generated, 400);
        assert_eq!(snap.units_done, 400);
        assert_eq!(snap.sifted, 4);
        assert_eq!(snap.improved, 0);
    }
}
