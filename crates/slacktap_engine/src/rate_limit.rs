//! Per-resource request throttling.
//!
//! The policy is a fixed pause of `60 / R` seconds after every request,
//! where `R` is the resource's maximum requests per minute. This is a
//! token bucket of size one, not a sliding window. Every resource owns its
//! own limiter; partitions of the same resource share it.

use crate::clock::Clock;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Blocks callers to keep a resource under its request budget.
pub struct RateLimiter {
    interval: Duration,
    clock: Arc<dyn Clock>,
    stats: Mutex<RateLimiterStats>,
}

/// Counters kept by a [`RateLimiter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimiterStats {
    /// Number of `acquire` calls.
    pub acquisitions: u64,
    /// Total time spent waiting.
    pub waited: Duration,
}

impl RateLimiter {
    /// Creates a limiter allowing `max_per_minute` requests per minute.
    ///
    /// `0` disables throttling.
    pub fn per_minute(max_per_minute: u32, clock: Arc<dyn Clock>) -> Self {
        let interval = if max_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(60_000_000_000 / u64::from(max_per_minute))
        };
        Self {
            interval,
            clock,
            stats: Mutex::new(RateLimiterStats::default()),
        }
    }

    /// The pause imposed per acquisition.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until another request is allowed.
    pub fn acquire(&self) {
        if !self.interval.is_zero() {
            self.clock.sleep(self.interval);
        }
        let mut stats = self.stats.lock();
        stats.acquisitions += 1;
        stats.waited += self.interval;
    }

    /// Returns the counters.
    pub fn stats(&self) -> RateLimiterStats {
        *self.stats.lock()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("interval", &self.interval)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn sixty_per_minute_waits_one_second() {
        let clock = clock();
        let limiter = RateLimiter::per_minute(60, clock.clone());

        limiter.acquire();
        limiter.acquire();
        limiter.acquire();

        assert_eq!(limiter.interval(), Duration::from_secs(1));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(1); 3]);
        assert_eq!(limiter.stats().acquisitions, 3);
        assert_eq!(limiter.stats().waited, Duration::from_secs(3));
    }

    #[test]
    fn limiters_do_not_share_budget() {
        let clock = clock();
        let slow = RateLimiter::per_minute(60, clock.clone());
        let fast = RateLimiter::per_minute(200, clock.clone());

        slow.acquire();
        fast.acquire();

        assert_eq!(fast.interval(), Duration::from_millis(300));
        assert_eq!(slow.stats().acquisitions, 1);
        assert_eq!(fast.stats().acquisitions, 1);
    }

    #[test]
    fn zero_disables_throttling() {
        let clock = clock();
        let limiter = RateLimiter::per_minute(0, clock.clone());
        limiter.acquire();
        assert_eq!(clock.total_slept(), Duration::ZERO);
        assert!(clock.sleeps().is_empty());
        assert_eq!(limiter.stats().acquisitions, 1);
    }
}
