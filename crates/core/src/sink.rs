//! Telemetry sink seam — trait for delivering session payloads to the
//! backend.
//!
//! The tracker holds an `Arc<dyn TelemetrySink>` so the transport can be
//! swapped: HTTP in production, a no-op when telemetry is disabled, and a
//! capture sink in tests.

use crate::error::{TrackerError, TrackerResult};
use crate::types::{SessionEndPayload, SessionStartPayload, SyncPayload};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Destination for session telemetry. All three operations map to one
/// `POST` against the tracking backend.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn start_session(&self, payload: &SessionStartPayload) -> TrackerResult<()>;
    async fn sync(&self, payload: &SyncPayload) -> TrackerResult<()>;
    async fn end_session(&self, payload: &SessionEndPayload) -> TrackerResult<()>;
}

/// No-op sink for disabled telemetry and modules that don't care.
pub struct NoOpSink;

#[async_trait]
impl TelemetrySink for NoOpSink {
    async fn start_session(&self, _payload: &SessionStartPayload) -> TrackerResult<()> {
        Ok(())
    }

    async fn sync(&self, _payload: &SyncPayload) -> TrackerResult<()> {
        Ok(())
    }

    async fn end_session(&self, _payload: &SessionEndPayload) -> TrackerResult<()> {
        Ok(())
    }
}

/// In-memory sink that captures payloads for testing. Can be switched
/// into a failing mode to exercise transport-error paths.
#[derive(Default)]
pub struct CaptureSink {
    starts: Mutex<Vec<SessionStartPayload>>,
    syncs: Mutex<Vec<SyncPayload>>,
    ends: Mutex<Vec<SessionEndPayload>>,
    failing: AtomicBool,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every sink call returns a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn starts(&self) -> Vec<SessionStartPayload> {
        self.starts.lock().expect("capture sink mutex poisoned").clone()
    }

    pub fn syncs(&self) -> Vec<SyncPayload> {
        self.syncs.lock().expect("capture sink mutex poisoned").clone()
    }

    pub fn ends(&self) -> Vec<SessionEndPayload> {
        self.ends.lock().expect("capture sink mutex poisoned").clone()
    }

    pub fn sync_count(&self) -> usize {
        self.syncs.lock().expect("capture sink mutex poisoned").len()
    }

    pub fn last_sync(&self) -> Option<SyncPayload> {
        self.syncs
            .lock()
            .expect("capture sink mutex poisoned")
            .last()
            .cloned()
    }

    fn check(&self) -> TrackerResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(TrackerError::Transport("capture sink set to fail".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TelemetrySink for CaptureSink {
    async fn start_session(&self, payload: &SessionStartPayload) -> TrackerResult<()> {
        self.check()?;
        self.starts
            .lock()
            .expect("capture sink mutex poisoned")
            .push(payload.clone());
        Ok(())
    }

    async fn sync(&self, payload: &SyncPayload) -> TrackerResult<()> {
        self.check()?;
        self.syncs
            .lock()
            .expect("capture sink mutex poisoned")
            .push(payload.clone());
        Ok(())
    }

    async fn end_session(&self, payload: &SessionEndPayload) -> TrackerResult<()> {
        self.check()?;
        self.ends
            .lock()
            .expect("capture sink mutex poisoned")
            .push(payload.clone());
        Ok(())
    }
}

/// Convenience: create a no-op sink.
pub fn noop_sink() -> Arc<dyn TelemetrySink> {
    Arc::new(NoOpSink)
}

/// Convenience: create a capture sink for tests.
pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeviceType, SessionStartPayload};
    use chrono::Utc;
    use uuid::Uuid;

    fn start_payload() -> SessionStartPayload {
        SessionStartPayload {
            session_id: Uuid::new_v4(),
            material_id: "mat-42".into(),
            device_type: DeviceType::Desktop,
            browser: "Firefox".into(),
            screen_resolution: "1920x1080".into(),
            started_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_capture_sink_records() {
        let sink = capture_sink();
        sink.start_session(&start_payload()).await.unwrap();
        assert_eq!(sink.starts().len(), 1);
        assert_eq!(sink.starts()[0].material_id, "mat-42");
    }

    #[tokio::test]
    async fn test_capture_sink_failing_mode() {
        let sink = capture_sink();
        sink.set_failing(true);
        let err = sink.start_session(&start_payload()).await.unwrap_err();
        assert!(matches!(err, TrackerError::Transport(_)));
        assert!(sink.starts().is_empty());

        sink.set_failing(false);
        sink.start_session(&start_payload()).await.unwrap();
        assert_eq!(sink.starts().len(), 1);
    }
}
