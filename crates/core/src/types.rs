//! Interaction event types, dwell-time entries, heatmap samples, and the
//! wire payloads for the three tracking endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Kind of a single user interaction captured by the tracker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Click,
    Scroll,
    Hover,
    TabHidden,
    TabVisible,
    CopyText,
    KeyboardShortcut,
    FlashcardFlip,
    NodeExpand,
    NodeCollapse,
    TabChange,
    SectionView,
    PauseStudy,
    ResumeStudy,
}

/// A single interaction event. Immutable once recorded; removed from the
/// pending buffer only after a confirmed flush.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub event_type: InteractionKind,
    pub timestamp: DateTime<Utc>,
    /// Seconds elapsed between session start and this event.
    pub time_since_session_start: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_position: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_position: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_position: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport_height: Option<f64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl InteractionEvent {
    pub fn new(
        event_type: InteractionKind,
        timestamp: DateTime<Utc>,
        time_since_session_start: f64,
    ) -> Self {
        Self {
            event_type,
            timestamp,
            time_since_session_start,
            element_id: None,
            element_type: None,
            element_text: None,
            x_position: None,
            y_position: None,
            scroll_position: None,
            viewport_height: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_element(
        mut self,
        id: Option<String>,
        element_type: Option<String>,
        text: Option<String>,
    ) -> Self {
        self.element_id = id;
        self.element_type = element_type;
        self.element_text = text;
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x_position = Some(x);
        self.y_position = Some(y);
        self
    }

    pub fn with_scroll(mut self, position: f64, viewport_height: f64) -> Self {
        self.scroll_position = Some(position);
        self.viewport_height = Some(viewport_height);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Cumulative dwell-time entry for one tracked section. Entries are never
/// removed client-side and every sync carries the full map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDwell {
    pub section_id: String,
    pub section_type: String,
    pub section_content_preview: String,
    pub total_time_seconds: f64,
    pub view_count: u32,
    pub first_view_at: DateTime<Utc>,
    pub last_view_at: DateTime<Utc>,
}

/// A click sample for heatmap rendering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ClickPoint {
    pub x: f64,
    pub y: f64,
    pub timestamp: DateTime<Utc>,
}

/// A rate-limited pointer-position sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MousePoint {
    pub x: f64,
    pub y: f64,
    pub timestamp: DateTime<Utc>,
}

/// A vertical scroll-offset sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScrollPoint {
    pub position: f64,
    pub timestamp: DateTime<Utc>,
}

/// Heatmap buffers as transmitted in a sync payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeatmapData {
    pub clicks: Vec<ClickPoint>,
    pub mouse_movements: Vec<MousePoint>,
    pub scroll_points: Vec<ScrollPoint>,
}

/// Summary counters accumulated over the whole session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_interactions: u64,
    pub scroll_events: u64,
    pub click_events: u64,
    pub hover_events: u64,
    pub focus_changes: u64,
    pub sections_visited: Vec<String>,
    pub max_scroll_depth: u8,
    pub unique_sections_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
}

/// How the session ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExitType {
    Normal,
    Manual,
    BrowserClose,
}

/// Identifying context supplied by the embedding host at startup.
///
/// `material_id` and `user_id` are required: without them no tracker is
/// created at all (telemetry is silently skipped).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub material_id: String,
    pub user_id: String,
    pub device_type: DeviceType,
    pub browser: String,
    pub screen_resolution: String,
}

/// Body of `POST session/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStartPayload {
    pub session_id: Uuid,
    pub material_id: String,
    pub device_type: DeviceType,
    pub browser: String,
    pub screen_resolution: String,
    pub started_at: DateTime<Utc>,
}

/// Metrics block of a sync payload: the running summary plus the current
/// time figures so the backend always sees up-to-date accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncMetrics {
    #[serde(flatten)]
    pub summary: MetricsSummary,
    pub total_time_seconds: u64,
    pub active_time_seconds: u64,
}

/// Body of `POST session/sync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPayload {
    pub session_id: Uuid,
    pub events: Vec<InteractionEvent>,
    pub section_times: Vec<SectionDwell>,
    pub heatmap_data: HeatmapData,
    pub metrics: SyncMetrics,
}

/// Body of `POST session/end`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEndPayload {
    pub session_id: Uuid,
    pub ended_at: DateTime<Utc>,
    pub total_time_seconds: u64,
    pub active_time_seconds: u64,
    pub exit_type: ExitType,
    pub metrics: MetricsSummary,
}
