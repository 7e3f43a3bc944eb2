//! Time source for the tick loop.
//!
//! The scheduler never reads the clock itself: the `Ticker` measures the
//! real elapsed time between ticks and hands the delta to
//! `Monitor::tick`. Built on `tokio::time::Instant` so paused-time tests
//! drive it deterministically.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Monotonic time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The runtime's clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-advanced clock for tests and replays.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Measures the time elapsed between consecutive ticks.
pub struct Ticker<C: Clock> {
    clock: C,
    last_tick: Instant,
}

impl<C: Clock> Ticker<C> {
    /// Starts measuring from now.
    pub fn new(clock: C) -> Self {
        let last_tick = clock.now();
        Self { clock, last_tick }
    }

    /// Time since the previous call (or since construction).
    pub fn delta(&mut self) -> Duration {
        let now = self.clock.now();
        let delta = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        delta
    }
}
