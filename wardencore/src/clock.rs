//! Sources of the as-of instant used to decide whether role assignments
//! are current.

pub trait Clock: Send + Sync {
    /// Unix timestamp in seconds.
    fn now(&self) -> i64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock frozen at a fixed instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}
