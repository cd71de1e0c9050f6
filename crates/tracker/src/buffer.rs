//! Pending-event buffer and session metrics counters.
//!
//! The buffer follows a snapshot/clear-on-success discipline: a flush
//! copies the pending sequence, and only the events actually sent are
//! drained afterwards, so events recorded while a flush is in flight are
//! carried by the next one — never lost, never duplicated.

use std::collections::BTreeSet;

use studylens_core::types::{InteractionEvent, InteractionKind, MetricsSummary};

pub struct EventBuffer {
    pending: Vec<InteractionEvent>,
    batch_size: usize,
    total_interactions: u64,
    scroll_events: u64,
    click_events: u64,
    hover_events: u64,
    focus_changes: u64,
    sections_visited: BTreeSet<String>,
    max_scroll_depth: u8,
}

impl EventBuffer {
    pub fn new(batch_size: usize) -> Self {
        Self {
            pending: Vec::with_capacity(batch_size),
            batch_size,
            total_interactions: 0,
            scroll_events: 0,
            click_events: 0,
            hover_events: 0,
            focus_changes: 0,
            sections_visited: BTreeSet::new(),
            max_scroll_depth: 0,
        }
    }

    /// Append an event and update the per-kind counters.
    ///
    /// Returns `true` when the pending count just reached the batch
    /// threshold, signalling the caller to trigger a flush. The signal
    /// fires on the threshold crossing itself, not on every event above
    /// it.
    pub fn record(&mut self, event: InteractionEvent) -> bool {
        self.total_interactions += 1;
        match event.event_type {
            InteractionKind::Click => self.click_events += 1,
            InteractionKind::Scroll => self.scroll_events += 1,
            InteractionKind::Hover => self.hover_events += 1,
            InteractionKind::TabHidden | InteractionKind::TabVisible => {
                self.focus_changes += 1;
            }
            InteractionKind::SectionView => {
                if let Some(id) = &event.element_id {
                    self.sections_visited.insert(id.clone());
                }
            }
            _ => {}
        }

        self.pending.push(event);
        self.pending.len() % self.batch_size == 0
    }

    pub fn record_scroll_depth(&mut self, depth_percent: u8) {
        let depth = depth_percent.min(100);
        if depth > self.max_scroll_depth {
            self.max_scroll_depth = depth;
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Copy of the pending sequence at call time.
    pub fn snapshot(&self) -> Vec<InteractionEvent> {
        self.pending.clone()
    }

    /// Drain exactly the first `sent` events — the snapshot that was
    /// confirmed delivered. Anything recorded since stays pending.
    pub fn clear_sent(&mut self, sent: usize) {
        let sent = sent.min(self.pending.len());
        self.pending.drain(..sent);
    }

    pub fn metrics_summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_interactions: self.total_interactions,
            scroll_events: self.scroll_events,
            click_events: self.click_events,
            hover_events: self.hover_events,
            focus_changes: self.focus_changes,
            sections_visited: self.sections_visited.iter().cloned().collect(),
            max_scroll_depth: self.max_scroll_depth,
            unique_sections_count: self.sections_visited.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(kind: InteractionKind) -> InteractionEvent {
        InteractionEvent::new(kind, Utc::now(), 0.0)
    }

    #[test]
    fn test_threshold_fires_on_crossing_only() {
        let mut buffer = EventBuffer::new(50);

        for i in 1..50 {
            assert!(!buffer.record(event(InteractionKind::Click)), "event {i}");
        }
        assert!(buffer.record(event(InteractionKind::Click)), "50th event");
        // 51st does not re-trigger until the threshold is reached again
        assert!(!buffer.record(event(InteractionKind::Click)));
        assert_eq!(buffer.pending_len(), 51);
    }

    #[test]
    fn test_clear_sent_keeps_raced_events() {
        let mut buffer = EventBuffer::new(50);
        for _ in 0..5 {
            buffer.record(event(InteractionKind::Click));
        }
        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.len(), 5);

        // Two events race in while the snapshot is in flight
        buffer.record(event(InteractionKind::Scroll));
        buffer.record(event(InteractionKind::Hover));

        buffer.clear_sent(snapshot.len());
        assert_eq!(buffer.pending_len(), 2);
        let remaining = buffer.snapshot();
        assert_eq!(remaining[0].event_type, InteractionKind::Scroll);
        assert_eq!(remaining[1].event_type, InteractionKind::Hover);
    }

    #[test]
    fn test_counters_and_summary() {
        let mut buffer = EventBuffer::new(50);
        buffer.record(event(InteractionKind::Click));
        buffer.record(event(InteractionKind::Click));
        buffer.record(event(InteractionKind::Scroll));
        buffer.record(event(InteractionKind::Hover));
        buffer.record(event(InteractionKind::TabHidden));
        buffer.record(event(InteractionKind::TabVisible));
        buffer.record(
            event(InteractionKind::SectionView)
                .with_element(Some("summary-block-0".into()), None, None),
        );
        buffer.record_scroll_depth(40);
        buffer.record_scroll_depth(25);

        let summary = buffer.metrics_summary();
        assert_eq!(summary.total_interactions, 7);
        assert_eq!(summary.click_events, 2);
        assert_eq!(summary.scroll_events, 1);
        assert_eq!(summary.hover_events, 1);
        assert_eq!(summary.focus_changes, 2);
        assert_eq!(summary.sections_visited, vec!["summary-block-0".to_string()]);
        assert_eq!(summary.unique_sections_count, 1);
        assert_eq!(summary.max_scroll_depth, 40);
    }

    #[test]
    fn test_counters_survive_clear() {
        let mut buffer = EventBuffer::new(50);
        buffer.record(event(InteractionKind::Click));
        buffer.clear_sent(1);
        assert_eq!(buffer.pending_len(), 0);
        // Summary counters are cumulative for the session
        assert_eq!(buffer.metrics_summary().total_interactions, 1);
        assert_eq!(buffer.metrics_summary().click_events, 1);
    }
}
