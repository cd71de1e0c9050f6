//! StudyLens core — shared types, configuration, error handling, and the
//! sink/time seams used by the tracker and the replay tool.
//!
//! # Modules
//!
//! - [`types`] — Interaction events, dwell entries, heatmap samples, wire payloads
//! - [`sink`] — The `TelemetrySink` trait plus no-op and capture implementations
//! - [`time`] — The `TimeSource` trait with wall-clock and manual implementations
//! - [`config`] — Tracker and sink configuration
//! - [`error`] — Error enum and result alias

pub mod config;
pub mod error;
pub mod sink;
pub mod time;
pub mod types;

pub use config::AppConfig;
pub use error::{TrackerError, TrackerResult};
