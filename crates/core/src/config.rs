use serde::Deserialize;

/// Root configuration. Loaded from environment variables with the prefix
/// `STUDYLENS__`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub sink: SinkConfig,
}

/// Timing and buffering knobs for the session tracker.
///
/// The idle sample interval is a tunable independent of the idle
/// threshold; nothing may assume a fixed ratio between the two.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Inactivity duration after which the session counts as idle.
    #[serde(default = "default_idle_threshold_ms")]
    pub idle_threshold_ms: u64,
    /// How often the idle sampler reconciles the accounting.
    #[serde(default = "default_idle_sample_interval_ms")]
    pub idle_sample_interval_ms: u64,
    /// Periodic sync interval.
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,
    /// Pending-event count that triggers an automatic flush.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Minimum gap between two retained mouse samples.
    #[serde(default = "default_mouse_sample_interval_ms")]
    pub mouse_sample_interval_ms: u64,
    /// Hard cap on retained mouse samples; exceeded, the buffer is
    /// truncated to the most recent half.
    #[serde(default = "default_mouse_buffer_cap")]
    pub mouse_buffer_cap: usize,
    /// Maximum characters of section content kept as preview.
    #[serde(default = "default_preview_max_chars")]
    pub preview_max_chars: usize,
    /// Maximum characters of element text carried on an event.
    #[serde(default = "default_event_text_max_chars")]
    pub event_text_max_chars: usize,
}

/// Transport configuration for the HTTP sink.
#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    /// Base URL of the tracking API, e.g. `https://host/api/tracking`.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Bearer credential supplied by the embedding host.
    #[serde(default)]
    pub bearer_token: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_idle_threshold_ms() -> u64 {
    30_000
}
fn default_idle_sample_interval_ms() -> u64 {
    5_000
}
fn default_sync_interval_ms() -> u64 {
    60_000
}
fn default_batch_size() -> usize {
    50
}
fn default_mouse_sample_interval_ms() -> u64 {
    100
}
fn default_mouse_buffer_cap() -> usize {
    1_000
}
fn default_preview_max_chars() -> usize {
    500
}
fn default_event_text_max_chars() -> usize {
    100
}
fn default_endpoint() -> String {
    "http://localhost:8000/api/tracking".to_string()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            idle_threshold_ms: default_idle_threshold_ms(),
            idle_sample_interval_ms: default_idle_sample_interval_ms(),
            sync_interval_ms: default_sync_interval_ms(),
            batch_size: default_batch_size(),
            mouse_sample_interval_ms: default_mouse_sample_interval_ms(),
            mouse_buffer_cap: default_mouse_buffer_cap(),
            preview_max_chars: default_preview_max_chars(),
            event_text_max_chars: default_event_text_max_chars(),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            bearer_token: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("STUDYLENS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_tracker_constants() {
        let config = TrackerConfig::default();
        assert_eq!(config.idle_threshold_ms, 30_000);
        assert_eq!(config.idle_sample_interval_ms, 5_000);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.mouse_sample_interval_ms, 100);
        assert_eq!(config.mouse_buffer_cap, 1_000);
    }

    #[test]
    fn test_sample_interval_independent_of_threshold() {
        // Both fields deserialize on their own; no derived ratio.
        let config: TrackerConfig =
            serde_json::from_str(r#"{"idle_threshold_ms": 20000}"#).unwrap();
        assert_eq!(config.idle_threshold_ms, 20_000);
        assert_eq!(config.idle_sample_interval_ms, 5_000);
    }
}
