//! End-to-end session flow against a capture sink with a manual clock.

use std::sync::Arc;

use studylens_core::config::TrackerConfig;
use studylens_core::sink::{capture_sink, CaptureSink};
use studylens_core::time::{manual_time, ManualTime};
use studylens_core::types::{DeviceType, ExitType, InteractionKind, SessionContext};
use studylens_tracker::{InputSignal, SectionMeta, SessionTracker};

fn context() -> SessionContext {
    SessionContext {
        material_id: "material-9".into(),
        user_id: "user-3".into(),
        device_type: DeviceType::Desktop,
        browser: "Firefox".into(),
        screen_resolution: "1920x1080".into(),
    }
}

fn new_tracker() -> (SessionTracker, Arc<CaptureSink>, Arc<ManualTime>) {
    let sink = capture_sink();
    let time = manual_time(chrono::Utc::now());
    let tracker =
        SessionTracker::new(context(), TrackerConfig::default(), sink.clone(), time.clone())
            .unwrap();
    (tracker, sink, time)
}

fn click() -> InputSignal {
    InputSignal::Click {
        x: 100.0,
        y: 200.0,
        element_id: Some("flashcard-1".into()),
        element_type: Some("DIV".into()),
        element_text: Some("front".into()),
    }
}

fn section(id: &str) -> InputSignal {
    InputSignal::SectionChange {
        section: SectionMeta {
            id: id.into(),
            section_type: "summary-block".into(),
            content_preview: format!("text of {id}"),
        },
    }
}

/// Reference timeline: activity at t=0, sampler every 5s, threshold
/// 30s. One pause_study at the crossing, accumulator growth afterwards,
/// one resume_study when activity returns.
#[tokio::test]
async fn idle_accounting_reference_timeline() {
    let (mut tracker, sink, time) = new_tracker();
    tracker.begin().await;

    tracker.handle_signal(click());

    for _ in 0..6 {
        time.advance_millis(5_000);
        tracker.sample_idle();
    }
    assert!(tracker.is_idle());

    time.advance_millis(5_000);
    tracker.sample_idle();

    time.advance_millis(5_000);
    tracker.sample_idle();

    // Activity returns at t=45s
    time.advance_millis(5_000);
    tracker.handle_signal(click());
    assert!(!tracker.is_idle());

    time.advance_millis(15_000);
    let payload = tracker.end(ExitType::Normal).await.unwrap();

    let syncs = sink.syncs();
    let events = &syncs.last().unwrap().events;
    let pauses: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == InteractionKind::PauseStudy)
        .collect();
    let resumes: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == InteractionKind::ResumeStudy)
        .collect();
    assert_eq!(pauses.len(), 1, "one pause per idle crossing");
    assert_eq!(resumes.len(), 1, "one resume per idle-to-active transition");
    assert_eq!(
        pauses[0].metadata["idle_duration"].as_i64(),
        Some(30_000),
        "pause carries the idle duration observed at first detection"
    );

    // Idle accrued at the 35s and 40s ticks only: 10s of 60s total
    assert_eq!(payload.total_time_seconds, 60);
    assert_eq!(payload.active_time_seconds, 50);
}

#[tokio::test]
async fn batch_threshold_triggers_single_flush() {
    let (mut tracker, sink, time) = new_tracker();
    tracker.begin().await;

    let mut threshold_hits = 0;
    for _ in 0..51 {
        time.advance_millis(100);
        if tracker.handle_signal(click()) {
            threshold_hits += 1;
            tracker.flush(false).await.unwrap();
        }
    }

    assert_eq!(threshold_hits, 1);
    assert_eq!(sink.sync_count(), 1);
    assert_eq!(sink.syncs()[0].events.len(), 50);
    assert_eq!(tracker.pending_events(), 1);
}

#[tokio::test]
async fn failed_sync_retains_then_succeeds() {
    let (mut tracker, sink, time) = new_tracker();
    tracker.begin().await;

    tracker.handle_signal(section("intro"));
    time.advance_millis(3_000);
    tracker.handle_signal(section("details"));
    tracker.handle_signal(click());
    let pending = tracker.pending_events();

    sink.set_failing(true);
    assert!(tracker.flush(false).await.is_err());
    assert_eq!(tracker.pending_events(), pending);

    sink.set_failing(false);
    tracker.flush(false).await.unwrap();
    assert_eq!(tracker.pending_events(), 0);

    let payload = sink.last_sync().unwrap();
    assert_eq!(payload.events.len(), pending);
    assert_eq!(payload.section_times.len(), 1);
    assert_eq!(payload.section_times[0].section_id, "intro");
    assert_eq!(payload.section_times[0].view_count, 1);
    assert!((payload.section_times[0].total_time_seconds - 3.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn tab_visibility_pauses_dwell_without_double_counting() {
    let (mut tracker, sink, time) = new_tracker();
    tracker.begin().await;

    tracker.handle_signal(section("intro"));
    time.advance_millis(5_000);
    tracker.handle_signal(InputSignal::VisibilityChanged { visible: false });

    // Hidden for 60s: no dwell accrues
    time.advance_millis(60_000);
    tracker.handle_signal(InputSignal::VisibilityChanged { visible: true });
    time.advance_millis(5_000);
    tracker.handle_signal(section("details"));

    tracker.flush(false).await.unwrap();
    let payload = sink.last_sync().unwrap();
    let dwell = &payload.section_times;
    let intro = dwell.iter().find(|s| s.section_id == "intro").unwrap();
    assert!((intro.total_time_seconds - 10.0).abs() < f64::EPSILON);
    assert_eq!(intro.view_count, 2);
}

#[tokio::test]
async fn heatmap_clears_clicks_and_scrolls_only() {
    let (mut tracker, sink, time) = new_tracker();
    tracker.begin().await;

    tracker.handle_signal(click());
    tracker.handle_signal(InputSignal::Scroll {
        position: 600.0,
        viewport_height: 800.0,
        depth_percent: 45,
    });
    time.advance_millis(200);
    tracker.handle_signal(InputSignal::MouseMove { x: 5.0, y: 5.0 });

    tracker.flush(false).await.unwrap();
    let first = sink.syncs()[0].heatmap_data.clone();
    assert_eq!(first.clicks.len(), 1);
    assert_eq!(first.scroll_points.len(), 1);
    assert_eq!(first.mouse_movements.len(), 1);

    time.advance_millis(200);
    tracker.handle_signal(click());
    tracker.flush(false).await.unwrap();
    let second = sink.syncs()[1].heatmap_data.clone();
    assert_eq!(second.clicks.len(), 1, "previous clicks were cleared");
    assert_eq!(second.scroll_points.len(), 0);
    assert_eq!(second.mouse_movements.len(), 1, "mouse window is retained");
}

#[tokio::test]
async fn session_end_reports_summary_metrics() {
    let (mut tracker, sink, time) = new_tracker();
    tracker.begin().await;
    assert_eq!(sink.starts().len(), 1);
    assert_eq!(sink.starts()[0].material_id, "material-9");

    tracker.handle_signal(section("intro"));
    tracker.handle_signal(click());
    tracker.handle_signal(InputSignal::Scroll {
        position: 300.0,
        viewport_height: 800.0,
        depth_percent: 30,
    });
    time.advance_millis(12_000);

    let payload = tracker.end(ExitType::BrowserClose).await.unwrap();
    assert_eq!(payload.exit_type, ExitType::BrowserClose);
    assert_eq!(payload.total_time_seconds, 12);
    assert_eq!(payload.metrics.click_events, 1);
    assert_eq!(payload.metrics.scroll_events, 1);
    assert_eq!(payload.metrics.max_scroll_depth, 30);
    assert_eq!(payload.metrics.sections_visited, vec!["intro".to_string()]);
    assert_eq!(sink.ends().len(), 1);

    // The final flush preceded the end notification
    assert!(sink.sync_count() >= 1);
}
