use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, SystemTime},
};

/// A source of wall-clock time for report cycles.
pub trait Clock: Send + Sync {
    /// Returns the current time, in milliseconds since the Unix epoch.
    fn time_millis(&self) -> u64;
}

/// A clock backed by the system's wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn time_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A clock whose time only changes when told to.
///
/// Clones share the same underlying time, so a handle can be kept to drive a clock that was moved into a reporter.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a new `ManualClock` set to the given time, in milliseconds since the Unix epoch.
    pub fn new(millis: u64) -> Self {
        Self { millis: Arc::new(AtomicU64::new(millis)) }
    }

    /// Sets the current time, in milliseconds since the Unix epoch.
    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::Release);
    }

    /// Moves the current time forward.
    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as u64, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn time_millis(&self) -> u64 {
        self.millis.load(Ordering::Acquire)
    }
}
