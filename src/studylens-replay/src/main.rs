//! StudyLens replay — drives a session tracker from a recorded signal log.
//!
//! Each line of the input file is one JSON record: a millisecond offset
//! from session start plus an input signal. Useful for exercising a
//! tracking backend with realistic sessions and for debugging the
//! accounting offline against the no-op sink.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};

use studylens_core::config::AppConfig;
use studylens_core::sink::{noop_sink, TelemetrySink};
use studylens_core::time::system_time;
use studylens_core::types::{DeviceType, ExitType, SessionContext};
use studylens_tracker::{spawn, HttpSink, InputSignal, SessionTracker};

#[derive(Parser, Debug)]
#[command(name = "studylens-replay")]
#[command(about = "Replay a recorded signal log through a session tracker")]
#[command(version)]
struct Cli {
    /// JSONL signal log to replay
    input: PathBuf,

    /// Material identifier for the replayed session
    #[arg(long)]
    material_id: String,

    /// User identifier for the replayed session
    #[arg(long)]
    user_id: String,

    /// Tracking API base URL (overrides config)
    #[arg(long, env = "STUDYLENS__SINK__ENDPOINT")]
    endpoint: Option<String>,

    /// Bearer token for the tracking API (overrides config)
    #[arg(long, env = "STUDYLENS__SINK__BEARER_TOKEN")]
    bearer_token: Option<String>,

    /// Post to the configured endpoint instead of the no-op sink
    #[arg(long, default_value_t = false)]
    live: bool,

    /// Honor the recorded offsets instead of replaying immediately
    #[arg(long, default_value_t = false)]
    realtime: bool,
}

/// One line of the replay log.
#[derive(Debug, Deserialize)]
struct ReplayRecord {
    at_ms: u64,
    #[serde(flatten)]
    signal: InputSignal,
}

fn read_log(path: &PathBuf) -> anyhow::Result<Vec<ReplayRecord>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ReplayRecord = serde_json::from_str(&line)
            .with_context(|| format!("parsing line {}", idx + 1))?;
        records.push(record);
    }
    Ok(records)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studylens=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(endpoint) = cli.endpoint {
        config.sink.endpoint = endpoint;
    }
    if let Some(token) = cli.bearer_token {
        config.sink.bearer_token = token;
    }

    let records = read_log(&cli.input)?;
    info!(
        signals = records.len(),
        input = %cli.input.display(),
        live = cli.live,
        "replay loaded"
    );

    let sink: Arc<dyn TelemetrySink> = if cli.live {
        Arc::new(HttpSink::new(&config.sink)?)
    } else {
        noop_sink()
    };

    let context = SessionContext {
        material_id: cli.material_id,
        user_id: cli.user_id,
        device_type: DeviceType::Desktop,
        browser: "replay".into(),
        screen_resolution: "1920x1080".into(),
    };

    let tracker = SessionTracker::new(context, config.tracker, sink, system_time())?;
    let (handle, join) = spawn(tracker);

    let mut explicit_end = false;
    let mut previous_ms = 0u64;
    for record in records {
        if cli.realtime && record.at_ms > previous_ms {
            tokio::time::sleep(std::time::Duration::from_millis(
                record.at_ms - previous_ms,
            ))
            .await;
        }
        previous_ms = record.at_ms;
        explicit_end = matches!(record.signal, InputSignal::EndSession { .. });
        handle.send(record.signal).await?;
        if explicit_end {
            break;
        }
    }
    if !explicit_end {
        handle.end(ExitType::Manual).await?;
    }

    let summary = join.await??;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
