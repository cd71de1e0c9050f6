//! Session tracker — wires the activity clock, event buffer, section
//! dwell map, and heatmap buffers together and dispatches sync payloads
//! to the telemetry sink.
//!
//! Transport failures never surface to the embedding host: payloads are
//! retained and retried on the next flush, and every error path degrades
//! to "telemetry silently incomplete".

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use studylens_core::config::TrackerConfig;
use studylens_core::sink::TelemetrySink;
use studylens_core::time::TimeSource;
use studylens_core::types::{
    ExitType, InteractionEvent, InteractionKind, MetricsSummary, SessionContext,
    SessionEndPayload, SessionStartPayload, SyncMetrics, SyncPayload,
};
use studylens_core::{TrackerError, TrackerResult};

use crate::buffer::EventBuffer;
use crate::clock::ActivityClock;
use crate::heatmap::HeatmapBuffer;
use crate::sections::{truncate_chars, SectionTracker, VisitedNodeSet};
use crate::signals::{shortcut_action, InputSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Active,
    Ended,
}

pub struct SessionTracker {
    session_id: Uuid,
    context: SessionContext,
    config: TrackerConfig,
    state: SessionState,
    clock: ActivityClock,
    buffer: EventBuffer,
    sections: SectionTracker,
    heatmap: HeatmapBuffer,
    nodes: VisitedNodeSet,
    tab_visible: bool,
    sink: Arc<dyn TelemetrySink>,
    time: Arc<dyn TimeSource>,
}

impl std::fmt::Debug for SessionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTracker")
            .field("session_id", &self.session_id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SessionTracker {
    /// Create a tracker for one page load.
    ///
    /// Refuses when the identifying context is incomplete — no partial
    /// tracker is ever created (the host skips telemetry entirely).
    pub fn new(
        context: SessionContext,
        config: TrackerConfig,
        sink: Arc<dyn TelemetrySink>,
        time: Arc<dyn TimeSource>,
    ) -> TrackerResult<Self> {
        if context.material_id.trim().is_empty() || context.user_id.trim().is_empty() {
            warn!("missing material or user identifier, tracker not created");
            return Err(TrackerError::Config(
                "material_id and user_id are required".into(),
            ));
        }

        let session_id = Uuid::new_v4();
        let start = time.now();
        info!(
            session_id = %session_id,
            material_id = %context.material_id,
            "session tracker created"
        );

        Ok(Self {
            session_id,
            state: SessionState::Starting,
            clock: ActivityClock::new(start, config.idle_threshold_ms),
            buffer: EventBuffer::new(config.batch_size),
            sections: SectionTracker::new(config.preview_max_chars),
            heatmap: HeatmapBuffer::new(config.mouse_sample_interval_ms, config.mouse_buffer_cap),
            nodes: VisitedNodeSet::new(),
            tab_visible: true,
            context,
            config,
            sink,
            time,
        })
    }

    /// Register the session with the backend and activate the tracker.
    /// A transport failure is logged and tracking continues regardless.
    pub async fn begin(&mut self) {
        if self.state != SessionState::Starting {
            return;
        }

        let payload = SessionStartPayload {
            session_id: self.session_id,
            material_id: self.context.material_id.clone(),
            device_type: self.context.device_type,
            browser: self.context.browser.clone(),
            screen_resolution: self.context.screen_resolution.clone(),
            started_at: self.clock.session_start(),
        };

        match self.sink.start_session(&payload).await {
            Ok(()) => info!(session_id = %self.session_id, "session registered with backend"),
            Err(e) => {
                warn!(error = %e, "session start notification failed, tracking continues")
            }
        }
        self.state = SessionState::Active;
    }

    /// Process one input signal.
    ///
    /// Returns `true` when the pending buffer just crossed the batch
    /// threshold and the caller should trigger a flush.
    pub fn handle_signal(&mut self, signal: InputSignal) -> bool {
        if self.state == SessionState::Ended {
            debug!(session_id = %self.session_id, "signal ignored after session end");
            return false;
        }

        let now = self.time.now();
        match signal {
            InputSignal::Click {
                x,
                y,
                element_id,
                element_type,
                element_text,
            } => {
                let mut needs_flush = self.touch(now);
                self.heatmap.record_click(x, y, now);
                let event = self
                    .event_at(InteractionKind::Click, now)
                    .with_element(element_id, element_type, self.clip(element_text))
                    .with_position(x, y);
                needs_flush |= self.buffer.record(event);
                needs_flush
            }
            InputSignal::Scroll {
                position,
                viewport_height,
                depth_percent,
            } => {
                let mut needs_flush = self.touch(now);
                self.heatmap.record_scroll(position, now);
                self.buffer.record_scroll_depth(depth_percent);
                let event = self
                    .event_at(InteractionKind::Scroll, now)
                    .with_scroll(position, viewport_height)
                    .with_meta("scroll_depth", json!(depth_percent.min(100)));
                needs_flush |= self.buffer.record(event);
                needs_flush
            }
            InputSignal::Hover {
                element_id,
                element_type,
                element_text,
            } => {
                let mut needs_flush = self.touch(now);
                let event = self
                    .event_at(InteractionKind::Hover, now)
                    .with_element(element_id, element_type, self.clip(element_text));
                needs_flush |= self.buffer.record(event);
                needs_flush
            }
            InputSignal::MouseMove { x, y } => {
                // Pointer samples feed the heatmap only; they are not
                // interaction events and do not refresh activity.
                self.heatmap.record_mouse(x, y, now);
                false
            }
            InputSignal::VisibilityChanged { visible } => {
                if visible {
                    let mut needs_flush = self.touch(now);
                    self.tab_visible = true;
                    self.sections.resume(now);
                    needs_flush |= self
                        .buffer
                        .record(self.event_at(InteractionKind::TabVisible, now));
                    needs_flush
                } else {
                    self.tab_visible = false;
                    self.sections.pause(now);
                    self.buffer
                        .record(self.event_at(InteractionKind::TabHidden, now))
                }
            }
            InputSignal::CopyText { text } => {
                let mut needs_flush = self.touch(now);
                let length = text.chars().count();
                let event = self
                    .event_at(InteractionKind::CopyText, now)
                    .with_element(
                        None,
                        None,
                        Some(truncate_chars(&text, self.config.preview_max_chars)),
                    )
                    .with_meta("text_length", json!(length));
                needs_flush |= self.buffer.record(event);
                needs_flush
            }
            InputSignal::KeyPress { key, ctrl } => {
                let mut needs_flush = self.touch(now);
                if let Some((shortcut, action)) = shortcut_action(&key, ctrl) {
                    let event = self
                        .event_at(InteractionKind::KeyboardShortcut, now)
                        .with_meta("shortcut", json!(shortcut))
                        .with_meta("action", json!(action));
                    needs_flush |= self.buffer.record(event);
                }
                needs_flush
            }
            InputSignal::FlashcardFlip {
                element_id,
                front_text,
            } => {
                let mut needs_flush = self.touch(now);
                let event = self
                    .event_at(InteractionKind::FlashcardFlip, now)
                    .with_element(Some(element_id), None, self.clip(front_text));
                needs_flush |= self.buffer.record(event);
                needs_flush
            }
            InputSignal::NodeToggle {
                element_id,
                element_text,
                expanding,
            } => {
                let mut needs_flush = self.touch(now);
                let kind = if expanding {
                    InteractionKind::NodeExpand
                } else {
                    InteractionKind::NodeCollapse
                };
                let event = self
                    .event_at(kind, now)
                    .with_element(Some(element_id), None, self.clip(element_text));
                needs_flush |= self.buffer.record(event);
                needs_flush
            }
            InputSignal::TabChange {
                element_id,
                tab_name,
            } => {
                let mut needs_flush = self.touch(now);
                let event = self
                    .event_at(InteractionKind::TabChange, now)
                    .with_element(Some(element_id), None, None)
                    .with_meta("tab_name", json!(tab_name));
                needs_flush |= self.buffer.record(event);
                needs_flush
            }
            InputSignal::SectionChange { section } => {
                let mut needs_flush = self.touch(now);
                if self.sections.record_transition(&section, now) {
                    let event = self
                        .event_at(InteractionKind::SectionView, now)
                        .with_element(
                            Some(section.id.clone()),
                            Some(section.section_type.clone()),
                            Some(truncate_chars(
                                &section.content_preview,
                                self.config.event_text_max_chars,
                            )),
                        );
                    needs_flush |= self.buffer.record(event);
                }
                needs_flush
            }
            InputSignal::NodeRegistered {
                node_id,
                display_text,
            } => {
                // Credited once per logical node, however many times the
                // rendering layer recreates it.
                if self.nodes.register(&node_id) {
                    let event = self
                        .event_at(InteractionKind::NodeExpand, now)
                        .with_element(Some(node_id), None, self.clip(display_text));
                    self.buffer.record(event)
                } else {
                    false
                }
            }
            InputSignal::EndSession { .. } => {
                debug!("end-session signal is handled by the runtime loop");
                false
            }
        }
    }

    /// Periodic idle reconciliation tick.
    pub fn sample_idle(&mut self) {
        if self.state == SessionState::Ended {
            return;
        }
        self.sample_idle_inner();
    }

    /// Flush buffered telemetry to the sink.
    ///
    /// No-op when nothing is pending unless this is the final flush. On
    /// confirmed delivery the sent events and the click/scroll heatmap
    /// buffers are cleared; the dwell map and mouse window stay. On
    /// failure everything is retained for the next attempt.
    pub async fn flush(&mut self, is_final: bool) -> TrackerResult<()> {
        if self.state == SessionState::Ended && !is_final {
            return Ok(());
        }
        if self.buffer.pending_len() == 0 && !is_final {
            return Ok(());
        }

        // Reconcile idle accounting so the transmitted figures are current.
        self.sample_idle_inner();

        let now = self.time.now();
        let events = self.buffer.snapshot();
        let sent = events.len();
        let payload = SyncPayload {
            session_id: self.session_id,
            events,
            section_times: self.sections.snapshot(),
            heatmap_data: self.heatmap.snapshot(),
            metrics: SyncMetrics {
                summary: self.buffer.metrics_summary(),
                total_time_seconds: whole_secs(self.clock.elapsed(now)),
                active_time_seconds: whole_secs(self.clock.active_time(now)),
            },
        };

        match self.sink.sync(&payload).await {
            Ok(()) => {
                self.buffer.clear_sent(sent);
                self.heatmap.clear_sent();
                debug!(
                    session_id = %self.session_id,
                    count = sent,
                    "telemetry synced"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    session_id = %self.session_id,
                    error = %e,
                    pending = self.buffer.pending_len(),
                    "sync failed, telemetry retained for next flush"
                );
                Err(e)
            }
        }
    }

    /// Terminate the session: one final flush, then the end notification
    /// (best effort — the page may already be tearing down).
    ///
    /// The session is terminal afterwards; signals, samples, and flushes
    /// all become no-ops.
    pub async fn end(&mut self, exit_type: ExitType) -> TrackerResult<SessionEndPayload> {
        if self.state == SessionState::Ended {
            return Err(TrackerError::SessionEnded);
        }
        self.state = SessionState::Ended;

        // flush(true) runs the final idle-accumulation pass before the
        // duration figures below are computed.
        let _ = self.flush(true).await;

        let now = self.time.now();
        let payload = SessionEndPayload {
            session_id: self.session_id,
            ended_at: now,
            total_time_seconds: whole_secs(self.clock.elapsed(now)),
            active_time_seconds: whole_secs(self.clock.active_time(now)),
            exit_type,
            metrics: self.buffer.metrics_summary(),
        };

        if let Err(e) = self.sink.end_session(&payload).await {
            warn!(session_id = %self.session_id, error = %e, "session end notification failed");
        }

        info!(
            session_id = %self.session_id,
            exit_type = ?exit_type,
            total_time_seconds = payload.total_time_seconds,
            active_time_seconds = payload.active_time_seconds,
            "session ended"
        );
        Ok(payload)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pending_events(&self) -> usize {
        self.buffer.pending_len()
    }

    pub fn is_idle(&self) -> bool {
        self.clock.is_idle()
    }

    pub fn is_tab_visible(&self) -> bool {
        self.tab_visible
    }

    pub fn metrics(&self) -> MetricsSummary {
        self.buffer.metrics_summary()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Refresh the activity clock; emits the `resume_study` event when
    /// this signal ends an idle period.
    fn touch(&mut self, now: DateTime<Utc>) -> bool {
        if self.clock.record_activity(now) {
            debug!(session_id = %self.session_id, "user active again");
            let event = self.event_at(InteractionKind::ResumeStudy, now);
            return self.buffer.record(event);
        }
        false
    }

    fn sample_idle_inner(&mut self) {
        let now = self.time.now();
        if let Some(onset) = self.clock.sample_idle(now) {
            debug!(
                session_id = %self.session_id,
                idle_ms = onset.idle_for.num_milliseconds(),
                "user idle"
            );
            let event = self
                .event_at(InteractionKind::PauseStudy, now)
                .with_meta("idle_duration", json!(onset.idle_for.num_milliseconds()));
            self.buffer.record(event);
        }
    }

    fn event_at(&self, kind: InteractionKind, now: DateTime<Utc>) -> InteractionEvent {
        let since_start = self.clock.elapsed(now).num_milliseconds() as f64 / 1_000.0;
        InteractionEvent::new(kind, now, since_start)
    }

    fn clip(&self, text: Option<String>) -> Option<String> {
        text.map(|t| truncate_chars(&t, self.config.event_text_max_chars))
    }
}

fn whole_secs(duration: chrono::Duration) -> u64 {
    duration.num_seconds().max(0) as u64
}
