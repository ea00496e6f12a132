// Clock abstraction for time-based state transitions

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Source of "now" for expiry, lockout and rate-window checks.
///
/// All time-based transitions in this crate are evaluated lazily on read, so
/// injecting a clock is enough to make them deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by the system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests
///
/// Starts at a fixed instant and only moves when told to, so simulated delays
/// (session timeouts, lockout windows, rate windows) are exact.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Advance the clock by the given number of milliseconds
    pub fn advance_millis(&self, millis: i64) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now += Duration::milliseconds(millis);
    }

    /// Jump the clock to a specific instant
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now = instant;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock poisoned")
    }
}
