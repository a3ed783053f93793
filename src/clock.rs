// Injectable time source

use std::sync::atomic::{AtomicI64, Ordering};

/// Source of "now" for creation/modification stamping.
///
/// The store reads time through this trait only, so tests can pin the clock
/// to a fixed instant and assert exact timestamps.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch
    fn now_ms(&self) -> i64;
}

/// Wall-clock time from the OS
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        now_ms()
    }
}

/// A clock frozen at a fixed instant, advanceable by hand
#[derive(Debug)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    /// Move the frozen instant
    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Advance the frozen instant by `delta_ms`
    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Helper function for timestamps outside the store
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System time before Unix epoch")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms() {
        let ts = now_ms();
        assert!(ts > 0);
        // Should be reasonable timestamp (after year 2020)
        assert!(ts > 1_600_000_000_000);
    }

    #[test]
    fn test_system_clock_tracks_wall_time() {
        let clock = SystemClock;
        let before = now_ms();
        let observed = clock.now_ms();
        let after = now_ms();
        assert!(before <= observed && observed <= after);
    }

    #[test]
    fn test_fixed_clock_stays_put() {
        let clock = FixedClock::new(1_700_000_000_000);
        assert_eq!(clock.now_ms(), 1_700_000_000_000);
        assert_eq!(clock.now_ms(), 1_700_000_000_000);
    }

    #[test]
    fn test_fixed_clock_set_and_advance() {
        let clock = FixedClock::new(1000);
        clock.set(5000);
        assert_eq!(clock.now_ms(), 5000);
        clock.advance(250);
        assert_eq!(clock.now_ms(), 5250);
    }
}
