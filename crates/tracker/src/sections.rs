//! Per-section dwell-time tracking and the visited-node set.
//!
//! The dwell map is cumulative session state: entries are never removed
//! and every sync payload carries the full map.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use studylens_core::types::SectionDwell;

/// Identity of a tracked content section as assigned by the host's
/// region-marking pass.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SectionMeta {
    pub id: String,
    pub section_type: String,
    pub content_preview: String,
}

pub struct SectionTracker {
    sections: HashMap<String, SectionDwell>,
    current: Option<SectionMeta>,
    dwell_started: Option<DateTime<Utc>>,
    preview_max_chars: usize,
}

impl SectionTracker {
    pub fn new(preview_max_chars: usize) -> Self {
        Self {
            sections: HashMap::new(),
            current: None,
            dwell_started: None,
            preview_max_chars,
        }
    }

    /// The closest-visible section changed.
    ///
    /// Finalizes the previous section's dwell before switching, then
    /// starts the new section's timer. Returns `true` when the section
    /// actually changed, in which case the caller emits a `section_view`
    /// event for the new section.
    pub fn record_transition(&mut self, meta: &SectionMeta, now: DateTime<Utc>) -> bool {
        if self.current.as_ref().map(|m| m.id.as_str()) == Some(meta.id.as_str()) {
            return false;
        }

        self.finalize_current(now);
        self.current = Some(meta.clone());
        self.dwell_started = Some(now);
        true
    }

    /// Tab went hidden: finalize the running dwell but keep the current
    /// section pointer so `resume` can restart its timer.
    pub fn pause(&mut self, now: DateTime<Utc>) {
        self.finalize_current(now);
    }

    /// Tab became visible again: restart the timer for the same section
    /// without crediting another view.
    pub fn resume(&mut self, now: DateTime<Utc>) {
        if self.current.is_some() && self.dwell_started.is_none() {
            self.dwell_started = Some(now);
        }
    }

    /// Full dwell map, sorted by section id for stable payloads.
    pub fn snapshot(&self) -> Vec<SectionDwell> {
        let mut entries: Vec<SectionDwell> = self.sections.values().cloned().collect();
        entries.sort_by(|a, b| a.section_id.cmp(&b.section_id));
        entries
    }

    pub fn current_section_id(&self) -> Option<&str> {
        self.current.as_ref().map(|m| m.id.as_str())
    }

    fn finalize_current(&mut self, now: DateTime<Utc>) {
        let Some(meta) = &self.current else {
            return;
        };
        let Some(started) = self.dwell_started.take() else {
            return;
        };

        let dwell_secs = (now - started).num_milliseconds().max(0) as f64 / 1_000.0;
        let preview_max = self.preview_max_chars;
        let entry = self
            .sections
            .entry(meta.id.clone())
            .or_insert_with(|| SectionDwell {
                section_id: meta.id.clone(),
                section_type: meta.section_type.clone(),
                section_content_preview: truncate_chars(&meta.content_preview, preview_max),
                total_time_seconds: 0.0,
                view_count: 0,
                first_view_at: now,
                last_view_at: now,
            });
        entry.total_time_seconds += dwell_secs;
        entry.view_count += 1;
        entry.last_view_at = now;
    }
}

/// Set of node identifiers already credited with a first-view event.
///
/// Guarantees each node contributes at most one expand event no matter
/// how often the host's rendering layer recreates it.
#[derive(Default)]
pub struct VisitedNodeSet {
    visited: HashSet<String>,
}

impl VisitedNodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only the first time a node id is registered.
    pub fn register(&mut self, node_id: &str) -> bool {
        self.visited.insert(node_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
