//! StudyLens tracker — session/idle-time accounting and event batching
//! for a learning-material viewer.
//!
//! # Modules
//!
//! - [`clock`] — Activity clock with incremental idle accounting
//! - [`buffer`] — Pending-event buffer and session metrics counters
//! - [`sections`] — Per-section dwell tracking and the visited-node set
//! - [`heatmap`] — Bounded click/mouse/scroll sample buffers
//! - [`signals`] — The host-facing input signal surface
//! - [`tracker`] — Session tracker and sync dispatcher
//! - [`runtime`] — Tokio loop multiplexing signals and timers
//! - [`http`] — HTTP implementation of the telemetry sink

pub mod buffer;
pub mod clock;
pub mod heatmap;
pub mod http;
pub mod runtime;
pub mod sections;
pub mod signals;
pub mod tracker;

pub use http::HttpSink;
pub use runtime::{spawn, TrackerHandle};
pub use sections::SectionMeta;
pub use signals::InputSignal;
pub use tracker::{SessionState, SessionTracker};
