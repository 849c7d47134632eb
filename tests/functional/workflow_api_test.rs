//! Functional tests for the product, planning and character endpoints

use axum::http::StatusCode;
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::common::{ark_urls, get, post_json, test_app, GENERATIONS_PATH};

const SEEDREAM: &str = "seedream-4-0-250828";
const SEEDEDIT: &str = "seededit-3-0-i2i-250628";

async fn mock_model(server: &MockServer, model: &str, url: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path(GENERATIONS_PATH))
        .and(body_partial_json(json!({"model": model})))
        .respond_with(ResponseTemplate::new(200).set_body_json(ark_urls(&[url.to_string()])))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_health_is_public_and_reports_upstream() {
    let server = MockServer::start().await;
    let (app, _) = test_app(&server);

    let response = get(&app, "/health").await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["provider"], "byteplus-ark");
    assert_eq!(body["upstream_configured"], true);
}

#[tokio::test]
async fn test_products_are_drafted_then_refined() {
    let server = MockServer::start().await;
    mock_model(&server, SEEDREAM, "https://cdn.example.com/draft.png", 2).await;
    Mock::given(method("POST"))
        .and(path(GENERATIONS_PATH))
        .and(body_partial_json(json!({
            "model": SEEDEDIT,
            "image": "https://cdn.example.com/draft.png",
            "size": "adaptive"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ark_urls(&["https://cdn.example.com/refined.png".to_string()])),
        )
        .expect(2)
        .mount(&server)
        .await;
    let (app, _) = test_app(&server);

    let response = post_json(
        &app,
        "/generate",
        json!({"prompts": ["a ceramic mug", "a leather wallet"]}),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json()["images_url"],
        json!([
            "https://cdn.example.com/refined.png",
            "https://cdn.example.com/refined.png"
        ])
    );
}

#[tokio::test]
async fn test_products_require_prompts() {
    let server = MockServer::start().await;
    let (app, _) = test_app(&server);

    let response = post_json(&app, "/generate", json!({"prompts": []})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = post_json(&app, "/generate", json!({"prompts": ["a mug", "  "]})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.text().contains("Prompts cannot be empty."));
}

#[tokio::test]
async fn test_plan_without_image_targets_seedream() {
    let server = MockServer::start().await;
    let (app, _) = test_app(&server);

    let response = post_json(
        &app,
        "/plan",
        json!({
            "final_prompt": "ukiyo-e portrait",
            "strength": 0.4,
            "constraints": ["face shape", ""]
        }),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["prompt"], "ukiyo-e portrait");
    assert_eq!(body["seedream_payload"]["preserve_identity"], json!(["face shape"]));
    assert!(body.get("seededit_payload").is_none());
}

#[tokio::test]
async fn test_plan_rejects_out_of_range_strength() {
    let server = MockServer::start().await;
    let (app, _) = test_app(&server);

    let response = post_json(
        &app,
        "/plan",
        json!({"final_prompt": "ukiyo-e portrait", "strength": 1.5}),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_character_with_input_image_uses_seededit() {
    let server = MockServer::start().await;
    mock_model(&server, SEEDEDIT, "https://cdn.example.com/chara.png", 1).await;
    mock_model(&server, SEEDREAM, "https://cdn.example.com/unused.png", 0).await;
    let (app, _) = test_app(&server);

    let response = post_json(
        &app,
        "/generate-chara",
        json!({
            "final_prompt": "pixel art hero",
            "strength": 0.8,
            "input_image": "https://example.com/me.jpg",
            "seededit_payload": {
                "input_image": "https://example.com/me.jpg",
                "prompt": "pixel art hero",
                "strength": 0.8,
                "preserve_identity": ["glasses"]
            }
        }),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["output_image_url"], "https://cdn.example.com/chara.png");
    assert!(body["seededit_response"].is_object());
    assert!(body.get("seedream_response").is_none());
}

#[tokio::test]
async fn test_character_without_image_uses_seedream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATIONS_PATH))
        .and(body_partial_json(json!({
            "model": SEEDREAM,
            "seed": 42,
            "size": "1024x1024"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ark_urls(&["https://cdn.example.com/fresh.png".to_string()])),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (app, _) = test_app(&server);

    let response = post_json(
        &app,
        "/generate-chara",
        json!({"final_prompt": "pixel art hero", "strength": 0.5}),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["output_image_url"], "https://cdn.example.com/fresh.png");
}
