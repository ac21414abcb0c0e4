//! Time source and blocking waits.
//!
//! Rate limiting and retry backoff are the only places the engine blocks.
//! Both go through a [`Clock`] so tests can run in virtual time.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::time::Duration;

/// Source of the current time and of blocking sleeps.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Blocks the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// The real clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// A clock that never blocks: sleeping advances virtual time.
///
/// Every sleep is recorded together with the virtual time at which it
/// started, so tests can assert on request spacing.
#[derive(Debug)]
pub struct ManualClock {
    inner: Mutex<ManualClockState>,
}

#[derive(Debug)]
struct ManualClockState {
    now: DateTime<Utc>,
    sleeps: Vec<(DateTime<Utc>, Duration)>,
}

impl ManualClock {
    /// Creates a clock starting at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(ManualClockState {
                now: start,
                sleeps: Vec::new(),
            }),
        }
    }

    /// Moves virtual time forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.inner.lock();
        state.now += chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
    }

    /// All sleeps so far.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.inner.lock().sleeps.iter().map(|(_, d)| *d).collect()
    }

    /// Total virtual time spent sleeping.
    pub fn total_slept(&self) -> Duration {
        self.inner.lock().sleeps.iter().map(|(_, d)| *d).sum()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.inner.lock().now
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.inner.lock();
        let at = state.now;
        state.sleeps.push((at, duration));
        state.now += chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
    }
}
