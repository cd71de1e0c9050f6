//! Tracker runtime — the single cooperative loop that owns a session.
//!
//! One task multiplexes the host's signal channel with the idle-sample
//! and periodic-sync timers. There is no concurrent mutation anywhere:
//! the loop processes one thing at a time and suspends only at sink
//! calls. The timers die with the loop, so nothing ticks after the
//! session ends.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use studylens_core::types::{ExitType, SessionEndPayload};
use studylens_core::{TrackerError, TrackerResult};

use crate::signals::InputSignal;
use crate::tracker::SessionTracker;

/// Depth of the signal channel between the host and the loop.
const SIGNAL_CHANNEL_CAPACITY: usize = 1_024;

/// Host-side handle for feeding signals into a running tracker.
#[derive(Clone)]
pub struct TrackerHandle {
    sender: mpsc::Sender<InputSignal>,
}

impl TrackerHandle {
    pub async fn send(&self, signal: InputSignal) -> TrackerResult<()> {
        self.sender
            .send(signal)
            .await
            .map_err(|_| TrackerError::SessionEnded)
    }

    /// Non-blocking send; a full or closed channel drops the signal.
    /// Telemetry is best-effort, the host is never held up.
    pub fn try_send(&self, signal: InputSignal) {
        if self.sender.try_send(signal).is_err() {
            debug!("signal dropped, tracker channel full or closed");
        }
    }

    /// Request an explicit session end.
    pub async fn end(&self, exit_type: ExitType) -> TrackerResult<()> {
        self.send(InputSignal::EndSession { exit_type }).await
    }
}

/// Spawn a tracker onto its own task and return the host handle plus the
/// join handle resolving to the session-end payload.
pub fn spawn(
    tracker: SessionTracker,
) -> (TrackerHandle, JoinHandle<TrackerResult<SessionEndPayload>>) {
    let (sender, receiver) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);
    let join = tokio::spawn(run(tracker, receiver));
    (TrackerHandle { sender }, join)
}

/// Drive a tracker until the session ends.
///
/// Ends on an explicit [`InputSignal::EndSession`] or, when the host
/// drops its handle (page teardown), as a `browser_close` exit.
pub async fn run(
    mut tracker: SessionTracker,
    mut signals: mpsc::Receiver<InputSignal>,
) -> TrackerResult<SessionEndPayload> {
    tracker.begin().await;
    info!(session_id = %tracker.session_id(), "tracker loop started");

    let idle_every = std::time::Duration::from_millis(tracker.config().idle_sample_interval_ms);
    let sync_every = std::time::Duration::from_millis(tracker.config().sync_interval_ms);
    // First tick only after a full period, not immediately
    let mut idle_interval =
        tokio::time::interval_at(tokio::time::Instant::now() + idle_every, idle_every);
    let mut sync_interval =
        tokio::time::interval_at(tokio::time::Instant::now() + sync_every, sync_every);

    loop {
        tokio::select! {
            maybe_signal = signals.recv() => match maybe_signal {
                Some(InputSignal::EndSession { exit_type }) => {
                    return tracker.end(exit_type).await;
                }
                Some(signal) => {
                    if tracker.handle_signal(signal) {
                        // Batch threshold crossed; failures already
                        // logged, data retained for the next attempt.
                        let _ = tracker.flush(false).await;
                    }
                }
                None => {
                    debug!(session_id = %tracker.session_id(), "signal channel closed");
                    return tracker.end(ExitType::BrowserClose).await;
                }
            },
            _ = idle_interval.tick() => tracker.sample_idle(),
            _ = sync_interval.tick() => {
                let _ = tracker.flush(false).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studylens_core::config::TrackerConfig;
    use studylens_core::sink::capture_sink;
    use studylens_core::time::system_time;
    use studylens_core::types::{DeviceType, SessionContext};

    fn context() -> SessionContext {
        SessionContext {
            material_id: "material-1".into(),
            user_id: "user-1".into(),
            device_type: DeviceType::Desktop,
            browser: "Chrome".into(),
            screen_resolution: "1280x800".into(),
        }
    }

    fn click() -> InputSignal {
        InputSignal::Click {
            x: 1.0,
            y: 2.0,
            element_id: None,
            element_type: None,
            element_text: None,
        }
    }

    #[tokio::test]
    async fn test_loop_runs_session_to_explicit_end() {
        let sink = capture_sink();
        let tracker = SessionTracker::new(
            context(),
            TrackerConfig::default(),
            sink.clone(),
            system_time(),
        )
        .unwrap();

        let (handle, join) = spawn(tracker);
        for _ in 0..3 {
            handle.send(click()).await.unwrap();
        }
        handle.end(ExitType::Manual).await.unwrap();

        let payload = join.await.unwrap().unwrap();
        assert_eq!(payload.exit_type, ExitType::Manual);
        assert_eq!(sink.starts().len(), 1);
        assert_eq!(sink.ends().len(), 1);
        // Final flush carried the three clicks
        assert_eq!(sink.last_sync().unwrap().events.len(), 3);
    }

    #[tokio::test]
    async fn test_dropped_handle_ends_as_browser_close() {
        let sink = capture_sink();
        let tracker = SessionTracker::new(
            context(),
            TrackerConfig::default(),
            sink.clone(),
            system_time(),
        )
        .unwrap();

        let (handle, join) = spawn(tracker);
        handle.send(click()).await.unwrap();
        drop(handle);

        let payload = join.await.unwrap().unwrap();
        assert_eq!(payload.exit_type, ExitType::BrowserClose);
        assert_eq!(sink.ends().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_threshold_flushes_mid_session() {
        let sink = capture_sink();
        let config = TrackerConfig {
            batch_size: 5,
            ..Default::default()
        };
        let tracker =
            SessionTracker::new(context(), config, sink.clone(), system_time()).unwrap();

        let (handle, join) = spawn(tracker);
        for _ in 0..5 {
            handle.send(click()).await.unwrap();
        }
        handle.end(ExitType::Manual).await.unwrap();
        join.await.unwrap().unwrap();

        // One threshold-triggered sync plus the final flush
        assert_eq!(sink.sync_count(), 2);
        assert_eq!(sink.syncs()[0].events.len(), 5);
    }
}
