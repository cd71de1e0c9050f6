//! Time source seam — lets the tracker's clock arithmetic run against a
//! controlled clock in tests.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// Source of the current instant. Production code uses [`SystemTime`];
/// tests drive a [`ManualTime`].
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time source.
pub struct SystemTime;

impl TimeSource for SystemTime {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced time source for deterministic tests.
pub struct ManualTime {
    current: Mutex<DateTime<Utc>>,
}

impl ManualTime {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    pub fn advance_millis(&self, millis: i64) {
        let mut current = self.current.lock().expect("time source mutex poisoned");
        *current += Duration::milliseconds(millis);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.current.lock().expect("time source mutex poisoned") = to;
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().expect("time source mutex poisoned")
    }
}

/// Convenience: wall-clock source for production trackers.
pub fn system_time() -> Arc<dyn TimeSource> {
    Arc::new(SystemTime)
}

/// Convenience: manual source for tests, returned concretely so callers
/// can advance it.
pub fn manual_time(start: DateTime<Utc>) -> Arc<ManualTime> {
    Arc::new(ManualTime::starting_at(start))
}
