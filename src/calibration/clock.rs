// Clock abstraction for calibration timing
//
// Calibration measures elapsed time and pauses between frames through this
// trait so tests can run a 30 s window without waiting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source with a cooperative sleep
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Suspend the calling thread for `period`
    fn sleep(&self, period: Duration);
}

/// Wall clock backed by `Instant::now` and `thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, period: Duration) {
        std::thread::sleep(period);
    }
}

/// Deterministic clock for tests
///
/// Time only moves when `sleep` or `advance` is called.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset_ns: AtomicU64,
    sleeps: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset_ns: AtomicU64::new(0),
            sleeps: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset_ns
            .fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Time advanced since construction
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.offset_ns.load(Ordering::SeqCst))
    }

    /// Number of `sleep` calls so far
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn sleep(&self, period: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        self.advance(period);
    }
}
