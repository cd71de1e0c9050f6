//! HTTP telemetry sink — posts session payloads to the tracking API.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use studylens_core::config::SinkConfig;
use studylens_core::sink::TelemetrySink;
use studylens_core::types::{SessionEndPayload, SessionStartPayload, SyncPayload};
use studylens_core::{TrackerError, TrackerResult};

pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
    bearer_token: String,
}

impl HttpSink {
    pub fn new(config: &SinkConfig) -> TrackerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| TrackerError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> TrackerResult<()> {
        let url = format!("{}/{}", self.endpoint, path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .json(body)
            .send()
            .await
            .map_err(|e| TrackerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::Transport(format!(
                "{path} returned {status}"
            )));
        }
        debug!(path = path, "telemetry delivered");
        Ok(())
    }
}

#[async_trait]
impl TelemetrySink for HttpSink {
    async fn start_session(&self, payload: &SessionStartPayload) -> TrackerResult<()> {
        self.post("session/start", payload).await
    }

    async fn sync(&self, payload: &SyncPayload) -> TrackerResult<()> {
        self.post("session/sync", payload).await
    }

    async fn end_session(&self, payload: &SessionEndPayload) -> TrackerResult<()> {
        self.post("session/end", payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash_normalized() {
        let sink = HttpSink::new(&SinkConfig {
            endpoint: "http://localhost:8000/api/tracking/".into(),
            bearer_token: "token".into(),
            request_timeout_ms: 1_000,
        })
        .unwrap();
        assert_eq!(sink.endpoint, "http://localhost:8000/api/tracking");
    }
}
