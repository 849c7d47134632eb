//! Unit tests for the performance recorder

use chrono::Utc;
use std::time::Duration;

use seedream_gateway::config::MetricsConfig;
use seedream_gateway::generation::UseCase;
use seedream_gateway::metrics::{AlertLevel, ApiCallSample, MetricsRecorder};

fn config(max_history: usize) -> MetricsConfig {
    MetricsConfig {
        max_history,
        ..MetricsConfig::default()
    }
}

fn sample(status: u16, millis: u64) -> ApiCallSample {
    let mut sample = ApiCallSample::new(
        "/byteplus-generate",
        "POST",
        status,
        Duration::from_millis(millis),
    );
    sample.use_case = Some(UseCase::Text2ImgSingle);
    if (200..300).contains(&status) {
        sample.images = 1;
    } else {
        sample.error = Some("Upstream returned 500: boom".to_string());
    }
    sample
}

#[test]
fn test_summary_counts_and_rates() {
    let recorder = MetricsRecorder::new(&config(100));
    recorder.record(sample(200, 100));
    recorder.record(sample(200, 300));
    recorder.record(sample(502, 200));
    recorder.record(sample(200, 400));

    let summary = recorder.summary();
    assert_eq!(summary.total_requests, 4);
    assert_eq!(summary.successful_requests, 3);
    assert_eq!(summary.failed_requests, 1);
    assert_eq!(summary.total_images, 3);
    assert!((summary.success_rate - 75.0).abs() < 1e-9);
    assert!((summary.error_rate - 25.0).abs() < 1e-9);
    assert!((summary.avg_response_time_ms - 250.0).abs() < 1e-6);

    let endpoint = &summary.endpoints["/byteplus-generate"];
    assert_eq!(endpoint.requests, 4);
    assert_eq!(endpoint.failures, 1);
}

#[test]
fn test_history_is_bounded_but_totals_are_not() {
    let recorder = MetricsRecorder::new(&config(3));
    for i in 0..5 {
        recorder.record(sample(200, i * 10));
    }

    let recent = recorder.recent(10);
    assert_eq!(recent.len(), 3);
    // Newest first
    assert!(recent[0].response_time_ms > recent[2].response_time_ms);
    assert_eq!(recorder.summary().total_requests, 5);
}

#[test]
fn test_error_log_only_holds_failures() {
    let recorder = MetricsRecorder::new(&config(100));
    recorder.record(sample(200, 10));
    recorder.record(sample(401, 10));
    recorder.record(sample(200, 10));

    let errors = recorder.errors(10);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].status, 401);
    assert!(!errors[0].success);
}

#[test]
fn test_alerts_on_low_success_rate() {
    let recorder = MetricsRecorder::new(&config(100));
    recorder.record(sample(200, 10));
    recorder.record(sample(500, 10));

    let alerts = recorder.alerts_at(Utc::now());
    assert!(alerts
        .iter()
        .any(|a| a.level == AlertLevel::Error && a.message.contains("error rate")));
    assert!(alerts.iter().any(|a| a.message.contains("Success rate")));
}

#[test]
fn test_no_alerts_when_healthy() {
    let recorder = MetricsRecorder::new(&config(100));
    for _ in 0..10 {
        recorder.record(sample(200, 50));
    }
    assert!(recorder.alerts().is_empty());
}

#[test]
fn test_clear_resets_everything() {
    let recorder = MetricsRecorder::new(&config(100));
    recorder.record(sample(500, 10));
    recorder.clear();

    let summary = recorder.summary();
    assert_eq!(summary.total_requests, 0);
    assert!(summary.endpoints.is_empty());
    assert!(recorder.errors(10).is_empty());
    assert_eq!(recorder.to_csv().lines().count(), 1);
}

#[tokio::test]
async fn test_csv_mirror_appends_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.csv");
    let recorder = MetricsRecorder::with_csv(&MetricsConfig {
        csv_path: Some(path.to_string_lossy().into_owned()),
        ..MetricsConfig::default()
    });

    recorder.record(sample(200, 10));
    recorder.record(sample(500, 10));

    let mut contents = String::new();
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        contents = tokio::fs::read_to_string(&path).await.unwrap_or_default();
        if contents.lines().count() == 3 {
            break;
        }
    }

    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("id,timestamp,endpoint"));
    assert!(lines[1].contains(",text2img_single,200,true,"));
    assert!(lines[2].contains("Upstream returned 500: boom"));
}

#[test]
fn test_success_rate_counts_evicted_calls() {
    let recorder = MetricsRecorder::new(&config(2));
    recorder.record(sample(200, 100));
    recorder.record(sample(200, 100));
    recorder.record(sample(500, 300));

    let summary = recorder.summary();
    // Retained history is [200, 500], but all three calls count toward success
    assert_eq!(summary.history_len, 2);
    assert!((summary.success_rate - 200.0 / 3.0).abs() < 1e-9);
    // Average, p95 and the windowed error rate only see the retained history
    assert!((summary.avg_response_time_ms - 200.0).abs() < 1e-6);
    assert!((summary.p95_response_time_ms - 300.0).abs() < 1e-6);
    assert!((summary.error_rate - 50.0).abs() < 1e-9);
}
