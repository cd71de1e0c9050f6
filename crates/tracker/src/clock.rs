//! Activity clock — accounts active and idle study time.
//!
//! Idle time is an accumulator updated incrementally at sample
//! boundaries, not a calculation derived at query time: activity can
//! resume and re-idle arbitrarily often between queries, and a derived
//! figure miscounts whenever a session contains more than one idle
//! period. The accounting error is bounded by one sample interval.

use chrono::{DateTime, Duration, Utc};

/// Reported once per idle-threshold crossing, carrying the idle duration
/// observed at first detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleOnset {
    pub idle_for: Duration,
}

/// Session timing state. All instants come from the caller so the clock
/// itself never consults the wall clock.
#[derive(Debug)]
pub struct ActivityClock {
    session_start: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    last_idle_check: DateTime<Utc>,
    accumulated_idle: Duration,
    currently_idle: bool,
    idle_threshold: Duration,
}

impl ActivityClock {
    pub fn new(start: DateTime<Utc>, idle_threshold_ms: u64) -> Self {
        Self {
            session_start: start,
            last_activity: start,
            last_idle_check: start,
            accumulated_idle: Duration::zero(),
            currently_idle: false,
            idle_threshold: Duration::milliseconds(idle_threshold_ms as i64),
        }
    }

    /// Register a qualifying activity signal.
    ///
    /// Returns `true` when this call is an idle-to-active transition, in
    /// which case the caller emits exactly one `resume_study` event.
    pub fn record_activity(&mut self, now: DateTime<Utc>) -> bool {
        let was_idle = now - self.last_activity >= self.idle_threshold;

        self.last_activity = now;
        self.last_idle_check = now;
        self.currently_idle = false;

        was_idle
    }

    /// Periodic idle reconciliation, called on a fixed interval
    /// independent of activity.
    ///
    /// Returns `Some` only on the tick that first detects the crossing;
    /// the caller emits one `pause_study` for it. Subsequent ticks while
    /// still idle grow the accumulator by the inter-sample delta and
    /// return `None`.
    pub fn sample_idle(&mut self, now: DateTime<Utc>) -> Option<IdleOnset> {
        let since_check = now - self.last_idle_check;
        let since_activity = now - self.last_activity;

        let onset = if since_activity >= self.idle_threshold {
            if self.currently_idle {
                self.accumulated_idle = self.accumulated_idle + since_check;
                None
            } else {
                self.currently_idle = true;
                Some(IdleOnset {
                    idle_for: since_activity,
                })
            }
        } else {
            // The transition event itself is record_activity's job; the
            // sampler only reconciles accounting.
            self.currently_idle = false;
            None
        };

        self.last_idle_check = now;
        onset
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        now - self.session_start
    }

    /// Active time: wall time elapsed minus accumulated idle time, never
    /// negative.
    pub fn active_time(&self, now: DateTime<Utc>) -> Duration {
        (self.elapsed(now) - self.accumulated_idle).max(Duration::zero())
    }

    pub fn accumulated_idle(&self) -> Duration {
        self.accumulated_idle
    }

    pub fn is_idle(&self) -> bool {
        self.currently_idle
    }

    pub fn session_start(&self) -> DateTime<Utc> {
        self.session_start
    }
}
