//! Clocks and the start/stop timer used by the benchmark loop.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Time elapsed since an arbitrary, fixed origin.
    fn now(&self) -> Duration;
}

/// Wall-clock time from [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    /// Create a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to.
///
/// Fake operators advance it by their simulated cost, which makes
/// measured times exact and reproducible.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    /// Create a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.advance_us(u64::try_from(by.as_micros()).unwrap_or(u64::MAX));
    }

    /// Move the clock forward by `us` microseconds.
    pub fn advance_us(&self, us: u64) {
        self.micros.fetch_add(us, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }
}

/// Start/stop timer reading a shared [`Clock`].
#[derive(Debug, Clone)]
pub struct Timer {
    clock: Arc<dyn Clock>,
    started_at: Option<Duration>,
    elapsed: Duration,
}

impl Timer {
    /// Create a stopped timer on `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            started_at: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Begin a measurement, discarding any previous one.
    pub fn start(&mut self) {
        self.elapsed = Duration::ZERO;
        self.started_at = Some(self.clock.now());
    }

    /// End the current measurement. No-op if the timer was never started.
    pub fn stop(&mut self) {
        if let Some(start) = self.started_at.take() {
            self.elapsed = self.clock.now().saturating_sub(start);
        }
    }

    /// Duration of the last completed measurement.
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Duration of the last completed measurement in whole microseconds.
    pub fn get_time_in_us(&self) -> u64 {
        u64::try_from(self.elapsed.as_micros()).unwrap_or(u64::MAX)
    }
}
