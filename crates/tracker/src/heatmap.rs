//! Bounded heatmap sample buffers.
//!
//! Clicks and scroll positions are cleared once delivered. Mouse samples
//! are a rolling window: rate-limited on the way in, truncated to the
//! most recent half of the cap when it overflows, and only the trailing
//! window is ever transmitted.

use chrono::{DateTime, Duration, Utc};
use studylens_core::types::{ClickPoint, HeatmapData, MousePoint, ScrollPoint};

pub struct HeatmapBuffer {
    clicks: Vec<ClickPoint>,
    mouse_movements: Vec<MousePoint>,
    scroll_points: Vec<ScrollPoint>,
    last_mouse_sample: Option<DateTime<Utc>>,
    min_mouse_gap: Duration,
    mouse_cap: usize,
}

impl HeatmapBuffer {
    pub fn new(mouse_sample_interval_ms: u64, mouse_cap: usize) -> Self {
        Self {
            clicks: Vec::new(),
            mouse_movements: Vec::new(),
            scroll_points: Vec::new(),
            last_mouse_sample: None,
            min_mouse_gap: Duration::milliseconds(mouse_sample_interval_ms as i64),
            mouse_cap,
        }
    }

    pub fn record_click(&mut self, x: f64, y: f64, timestamp: DateTime<Utc>) {
        self.clicks.push(ClickPoint { x, y, timestamp });
    }

    pub fn record_scroll(&mut self, position: f64, timestamp: DateTime<Utc>) {
        self.scroll_points.push(ScrollPoint {
            position,
            timestamp,
        });
    }

    /// Record a pointer sample unless it arrives before the minimum
    /// inter-sample gap has passed. Returns whether it was retained.
    pub fn record_mouse(&mut self, x: f64, y: f64, now: DateTime<Utc>) -> bool {
        if let Some(last) = self.last_mouse_sample {
            if now - last <= self.min_mouse_gap {
                return false;
            }
        }

        self.mouse_movements.push(MousePoint {
            x,
            y,
            timestamp: now,
        });
        self.last_mouse_sample = Some(now);

        if self.mouse_movements.len() > self.mouse_cap {
            let keep = self.mouse_cap / 2;
            let excess = self.mouse_movements.len() - keep;
            self.mouse_movements.drain(..excess);
        }
        true
    }

    /// Buffers as they would be transmitted: clicks and scrolls in full,
    /// mouse samples limited to the trailing half-cap window.
    pub fn snapshot(&self) -> HeatmapData {
        let window = self.mouse_cap / 2;
        let skip = self.mouse_movements.len().saturating_sub(window);
        HeatmapData {
            clicks: self.clicks.clone(),
            mouse_movements: self.mouse_movements[skip..].to_vec(),
            scroll_points: self.scroll_points.clone(),
        }
    }

    /// Clear what a confirmed flush delivered. Mouse samples stay: they
    /// are a rolling window, not a queue.
    pub fn clear_sent(&mut self) {
        self.clicks.clear();
        self.scroll_points.clear();
    }

    pub fn click_count(&self) -> usize {
        self.clicks.len()
    }

    pub fn mouse_sample_count(&self) -> usize {
        self.mouse_movements.len()
    }

    pub fn scroll_count(&self) -> usize {
        self.scroll_points.len()
    }
}
