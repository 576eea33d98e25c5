//! Lookup timing.
//!
//! [`ResolveTimer`] is shared by every lookup variant of an engine and records each
//! database call. It is lock-free: all state is atomics, so concurrent pipeline workers
//! can time their lookups without contention.
//!
//! ```
//! use geoipenrich::metrics::ResolveTimer;
//!
//! let timer = ResolveTimer::new();
//! {
//!     let _ctx = timer.time();
//!     // ... database lookup ...
//! }
//! assert_eq!(timer.snapshot().count, 1);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

// Bucket i holds samples in [2^i, 2^(i+1)) nanoseconds; bucket 0 also holds 0ns.
const BUCKETS: usize = 64;

/// Lock-free timer with a power-of-two latency histogram.
pub struct ResolveTimer {
    count: AtomicU64,
    total_ns: AtomicU64,
    min_ns: AtomicU64,
    max_ns: AtomicU64,
    buckets: [AtomicU64; BUCKETS],
}

impl Default for ResolveTimer {
    fn default() -> Self {
        Self {
            count: AtomicU64::new(0),
            total_ns: AtomicU64::new(0),
            min_ns: AtomicU64::new(u64::MAX),
            max_ns: AtomicU64::new(0),
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }
}

impl fmt::Debug for ResolveTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveTimer")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl ResolveTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start timing; the elapsed time is recorded when the returned context drops.
    #[inline]
    #[must_use = "the timing is recorded when the context is dropped"]
    pub fn time(&self) -> TimerContext<'_> {
        TimerContext {
            timer: self,
            start: Instant::now(),
        }
    }

    /// Record one sample.
    pub fn record(&self, elapsed: Duration) {
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ns.fetch_add(ns, Ordering::Relaxed);
        self.min_ns.fetch_min(ns, Ordering::Relaxed);
        self.max_ns.fetch_max(ns, Ordering::Relaxed);
        self.buckets[bucket_index(ns)].fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time view of the recorded samples.
    ///
    /// Fields are read independently, so a snapshot taken during concurrent recording
    /// may be off by the samples in flight.
    pub fn snapshot(&self) -> TimerSnapshot {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return TimerSnapshot::default();
        }

        let total_ns = self.total_ns.load(Ordering::Relaxed);
        let counts: Vec<u64> = self
            .buckets
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect();

        TimerSnapshot {
            count,
            min: Duration::from_nanos(self.min_ns.load(Ordering::Relaxed)),
            max: Duration::from_nanos(self.max_ns.load(Ordering::Relaxed)),
            mean: Duration::from_nanos(total_ns / count),
            p50: percentile(&counts, 0.50),
            p95: percentile(&counts, 0.95),
            p99: percentile(&counts, 0.99),
        }
    }
}

/// Records the elapsed time into its timer on drop.
pub struct TimerContext<'a> {
    timer: &'a ResolveTimer,
    start: Instant,
}

impl Drop for TimerContext<'_> {
    fn drop(&mut self) {
        self.timer.record(self.start.elapsed());
    }
}

/// Summary statistics. Percentiles are upper bounds of their histogram bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    pub count: u64,
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
}

impl fmt::Display for TimerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "count={} min={:?} mean={:?} max={:?} p50<={:?} p95<={:?} p99<={:?}",
            self.count, self.min, self.mean, self.max, self.p50, self.p95, self.p99
        )
    }
}

#[inline]
fn bucket_index(ns: u64) -> usize {
    if ns == 0 {
        0
    } else {
        ns.ilog2() as usize
    }
}

fn percentile(counts: &[u64], q: f64) -> Duration {
    let total: u64 = counts.iter().sum();
    let rank = ((total as f64) * q).ceil().max(1.0) as u64;
    let mut seen = 0u64;
    for (i, c) in counts.iter().enumerate() {
        seen += c;
        if seen >= rank {
            let upper = 1u64.checked_shl(i as u32 + 1).unwrap_or(u64::MAX);
            return Duration::from_nanos(upper);
        }
    }
    Duration::ZERO
}
