//! Functional tests for rate limiting

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use wiremock::MockServer;

use crate::common::{build_app, send, settings_for};
use seedream_gateway::middleware::RateLimitLayer;

async fn create_test_app(rps: u32, burst: u32) -> Router {
    Router::new()
        .route("/plan", axum::routing::post(|| async { "OK" }))
        .layer(RateLimitLayer::new(rps, burst))
}

fn plan_request() -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/plan")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"final_prompt": "watercolor fox", "strength": 0.5}).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_rate_limit_burst_capacity() {
    let app = create_test_app(1, 5).await;

    for _ in 0..5 {
        let response = app.clone().oneshot(plan_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.clone().oneshot(plan_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_gateway_throttles_api_calls() {
    let server = MockServer::start().await;
    let mut settings = settings_for(&server);
    settings.rate_limit.enabled = true;
    settings.rate_limit.requests_per_second = 1;
    settings.rate_limit.burst_size = 1;
    let (app, _) = build_app(settings);

    let first = send(&app, plan_request()).await;
    assert_eq!(first.status, StatusCode::OK);

    let mut rate_limited = None;
    for _ in 0..10 {
        let response = send(&app, plan_request()).await;
        if response.status == StatusCode::TOO_MANY_REQUESTS {
            rate_limited = Some(response);
            break;
        }
    }

    let response = rate_limited.expect("Expected rate limiting to kick in");
    let body = response.json();
    assert_eq!(body["error"]["type"], "rate_limit_error");
    assert_eq!(body["error"]["code"], "rate_limit_exceeded");
}

#[tokio::test]
async fn test_health_and_metrics_are_never_throttled() {
    let server = MockServer::start().await;
    let mut settings = settings_for(&server);
    settings.rate_limit.enabled = true;
    settings.rate_limit.requests_per_second = 1;
    settings.rate_limit.burst_size = 1;
    let (app, _) = build_app(settings);

    for uri in ["/health", "/metrics", "/metrics/history", "/health", "/metrics"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        assert_eq!(send(&app, request).await.status, StatusCode::OK, "{}", uri);
    }
}
