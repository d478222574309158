//! Monotonic time sources.

use parking_lot::Mutex;
use std::time::{Duration, Instant, SystemTime};

/// Time source for deadlines and wall-clock stamps.
pub trait Clock: Send + Sync {
    /// Monotonic instant used for deadline comparisons.
    fn now(&self) -> Instant;

    /// Wall-clock time used for stamps shown to users.
    fn wall_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic tests and offline hosts.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
    wall: Mutex<SystemTime>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
            wall: Mutex::new(SystemTime::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
        *self.wall.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }

    fn wall_time(&self) -> SystemTime {
        *self.wall.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now() - start, Duration::from_millis(250));
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
