//! Fixed-period task loop.
//!
//! Each background task (and the foreground loop) runs its tick body through
//! [`run_periodic`]: absolute next-deadline pacing, so a slow tick shortens
//! the following sleep instead of shifting every later tick. A tick body
//! always runs to completion; the `running` flag is only checked between
//! ticks, so a loop exits within one period of the flag being cleared.
//!
//! Overruns are counted and logged, never fatal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-tick timing statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleStats {
    /// Total ticks executed.
    pub cycle_count: u64,
    /// Last tick body duration [ns].
    pub last_cycle_ns: u64,
    /// Minimum tick body duration [ns].
    pub min_cycle_ns: u64,
    /// Maximum tick body duration [ns].
    pub max_cycle_ns: u64,
    /// Running sum for average computation.
    pub sum_cycle_ns: u128,
    /// Ticks whose body outlasted the period.
    pub overruns: u64,
    /// Maximum wake-up latency past the deadline [ns].
    pub max_latency_ns: u64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: u64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record one tick. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: u64, latency_ns: u64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += u128::from(duration_ns);
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average tick duration [ns] (0 if no ticks).
    #[inline]
    pub fn avg_cycle_ns(&self) -> u64 {
        if self.cycle_count == 0 {
            0
        } else {
            (self.sum_cycle_ns / u128::from(self.cycle_count)) as u64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Periodic Runner ────────────────────────────────────────────────

/// Run `body` every `period` until `running` is cleared.
///
/// Returns the collected statistics; they are also logged at exit.
pub fn run_periodic<F>(
    name: &str,
    period: Duration,
    running: &AtomicBool,
    mut body: F,
) -> CycleStats
where
    F: FnMut(),
{
    let mut stats = CycleStats::new();
    let period_ns = period.as_nanos() as u64;
    let mut deadline = Instant::now();

    debug!(task = name, period_ms = period.as_millis() as u64, "Periodic loop started");

    while running.load(Ordering::Acquire) {
        let start = Instant::now();
        let latency_ns = start.saturating_duration_since(deadline).as_nanos() as u64;

        body();

        let duration_ns = start.elapsed().as_nanos() as u64;
        stats.record(duration_ns, latency_ns);

        if duration_ns > period_ns {
            stats.overruns += 1;
            warn!(
                task = name,
                duration_us = duration_ns / 1000,
                period_us = period_ns / 1000,
                "Tick overrun"
            );
        }

        deadline += period;
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        } else {
            // More than one period behind: resync rather than burst.
            deadline = now;
        }
    }

    info!(
        task = name,
        ticks = stats.cycle_count,
        avg_us = stats.avg_cycle_ns() / 1000,
        max_us = stats.max_cycle_ns / 1000,
        max_latency_us = stats.max_latency_ns / 1000,
        overruns = stats.overruns,
        "Periodic loop stopped"
    );
    stats
}

// ─── Tests ──────────────────────────────────────────────────────────
