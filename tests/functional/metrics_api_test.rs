//! Functional tests for the performance metrics endpoints

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use seedream_gateway::metrics::SystemSample;
use serde_json::json;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::common::{ark_urls, get, post_json, send, test_app, GENERATIONS_PATH};

async fn mock_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(GENERATIONS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ark_urls(&["https://cdn.example.com/1.png".to_string()])),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_api_calls_are_recorded() {
    let server = MockServer::start().await;
    mock_ok(&server).await;
    let (app, recorder) = test_app(&server);

    post_json(&app, "/byteplus-generate", json!({"prompt": "a cat"})).await;
    post_json(&app, "/byteplus-generate", json!({"prompt": ""})).await;
    // Reads are not API calls
    get(&app, "/health").await;

    let summary = get(&app, "/metrics").await;
    assert_eq!(summary.status, StatusCode::OK);
    let summary = summary.json();
    assert_eq!(summary["total_requests"], 2);
    assert_eq!(summary["successful_requests"], 1);
    assert_eq!(summary["failed_requests"], 1);
    assert_eq!(summary["total_images"], 1);
    assert_eq!(summary["endpoints"]["/byteplus-generate"]["requests"], 2);

    let history = get(&app, "/metrics/history?limit=10").await.json();
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    // Newest first: the rejected call carries no use case
    assert_eq!(history[0]["status"], 400);
    assert_eq!(history[1]["use_case"], "text2img_single");
    assert!(history[1]["request_size"].as_u64().unwrap() > 0);
    assert!(history[1]["response_size"].as_u64().unwrap() > 0);

    let errors = get(&app, "/metrics/errors").await.json();
    assert_eq!(errors.as_array().unwrap().len(), 1);
    assert!(errors[0]["error"]
        .as_str()
        .unwrap()
        .contains("Prompt cannot be empty"));

    assert_eq!(recorder.summary().total_requests, 2);
}

#[tokio::test]
async fn test_alerts_flag_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATIONS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;
    let (app, _) = test_app(&server);

    for _ in 0..3 {
        let response = post_json(&app, "/byteplus-generate", json!({"prompt": "a cat"})).await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    }

    let alerts = get(&app, "/metrics/alerts").await.json();
    let alerts = alerts.as_array().unwrap();
    assert!(alerts.iter().any(|a| a["level"] == "error"));
}

#[tokio::test]
async fn test_csv_export_and_clear() {
    let server = MockServer::start().await;
    mock_ok(&server).await;
    let (app, _) = test_app(&server);

    post_json(&app, "/byteplus-generate", json!({"prompt": "a cat"})).await;

    let export = get(&app, "/metrics/export.csv").await;
    assert_eq!(export.status, StatusCode::OK);
    assert!(export.header("content-type").unwrap().starts_with("text/csv"));
    assert!(export
        .header("content-disposition")
        .unwrap()
        .contains("performance_metrics_"));
    let csv = export.text();
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.lines().nth(1).unwrap().contains("/byteplus-generate"));

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status, StatusCode::NO_CONTENT);

    let summary = get(&app, "/metrics").await.json();
    assert_eq!(summary["total_requests"], 0);
    assert_eq!(get(&app, "/metrics/history").await.json(), json!([]));
}

#[tokio::test]
async fn test_system_readings_feed_alerts_and_recommendations() {
    let server = MockServer::start().await;
    let (app, recorder) = test_app(&server);

    assert_eq!(get(&app, "/metrics/system").await.json(), json!([]));
    assert_eq!(get(&app, "/metrics/recommendations").await.json(), json!([]));

    // 95% CPU, 50% memory of 8 GiB
    recorder.record_system(SystemSample::new(95.0, 4 << 30, 4 << 30, 8 << 30));

    let system = get(&app, "/metrics/system?limit=5").await;
    assert_eq!(system.status, StatusCode::OK);
    let system = system.json();
    assert_eq!(system.as_array().unwrap().len(), 1);
    assert_eq!(system[0]["memory_percent"], 50.0);

    let summary = get(&app, "/metrics").await.json();
    assert_eq!(summary["peak_cpu_percent"], 95.0);
    assert_eq!(summary["system"]["cpu_percent"], 95.0);

    let alerts = get(&app, "/metrics/alerts").await.json();
    assert!(alerts
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a["level"] == "error" && a["message"].as_str().unwrap().contains("CPU")));

    let advice = get(&app, "/metrics/recommendations").await.json();
    let advice = advice.as_array().unwrap();
    assert_eq!(advice.len(), 1);
    assert!(advice[0].as_str().unwrap().contains("concurrent operations"));
}
