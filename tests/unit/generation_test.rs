//! Unit tests for request classification and forwarding

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use seedream_gateway::config::UpstreamConfig;
use seedream_gateway::error::{AppError, Result};
use seedream_gateway::generation::{
    build_upstream_request, timeout_for, GenerationService, UnifiedGenerationRequest, UseCase,
};
use seedream_gateway::upstream::{
    ArkImageRequest, ArkImageResponse, FetchedImage, ImageInput, ImageProvider,
};

fn request(value: serde_json::Value) -> UnifiedGenerationRequest {
    serde_json::from_value(value).unwrap()
}

/// Provider that remembers what it was asked and answers with a canned body
struct RecordingProvider {
    seen: Mutex<Vec<(ArkImageRequest, Duration)>>,
    answer: serde_json::Value,
}

impl RecordingProvider {
    fn new(answer: serde_json::Value) -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            answer,
        }
    }
}

#[async_trait]
impl ImageProvider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(
        &self,
        request: ArkImageRequest,
        timeout: Duration,
    ) -> Result<ArkImageResponse> {
        self.seen.lock().push((request, timeout));
        Ok(serde_json::from_value(self.answer.clone()).unwrap())
    }

    async fn fetch_image(&self, url: &str) -> Result<FetchedImage> {
        Err(AppError::ImageNotFound(url.to_string()))
    }
}

#[test]
fn test_classifies_all_use_cases() {
    let cases = [
        (json!({"prompt": "a cat"}), UseCase::Text2ImgSingle),
        (
            json!({"prompt": "a cat", "sequential_image_generation": "auto"}),
            UseCase::Text2ImgMultiple,
        ),
        (
            json!({"prompt": "a cat", "image": "https://example.com/a.png"}),
            UseCase::Img2ImgSingle,
        ),
        (
            json!({
                "prompt": "a cat",
                "image": "https://example.com/a.png",
                "sequential_image_generation": "auto"
            }),
            UseCase::Img2ImgExpand,
        ),
        (
            json!({
                "prompt": "a cat",
                "image": ["https://example.com/a.png", "https://example.com/b.png"]
            }),
            UseCase::Img2ImgMultipleRefs,
        ),
    ];

    for (body, expected) in cases {
        let req = request(body);
        assert!(req.validate().is_ok());
        assert_eq!(UseCase::classify(&req), expected);
    }
}

#[test]
fn test_single_element_list_is_single_reference() {
    let req = request(json!({"prompt": "a cat", "image": ["https://example.com/a.png"]}));
    assert_eq!(UseCase::classify(&req), UseCase::Img2ImgSingle);

    let upstream = build_upstream_request(&req, &UpstreamConfig::default());
    assert_eq!(
        upstream.image,
        Some(ImageInput::Single("https://example.com/a.png".to_string()))
    );
}

#[test]
fn test_validation_rejects_bad_requests() {
    let bad = [
        json!({"prompt": "   "}),
        json!({"prompt": "x".repeat(1001)}),
        json!({"prompt": "a cat", "size": "huge"}),
        json!({"prompt": "a cat", "sequential_image_generation": "sometimes"}),
        json!({"prompt": "a cat", "response_format": "file"}),
        json!({"prompt": "a cat", "image": []}),
        json!({"prompt": "a cat", "image": "ftp://example.com/a.png"}),
        json!({"prompt": "a cat", "guidance_scale": 11.0}),
        json!({
            "prompt": "a cat",
            "sequential_image_generation": "auto",
            "sequential_image_generation_options": {"max_images": 0}
        }),
    ];

    for body in bad {
        let req = request(body.clone());
        assert!(
            matches!(req.validate(), Err(AppError::InvalidRequest(_))),
            "expected rejection for {}",
            body
        );
    }
}

#[test]
fn test_upstream_request_defaults() {
    let config = UpstreamConfig::default();
    let req = request(json!({"prompt": "  a cat  ", "negative_prompt": "dogs"}));
    let upstream = build_upstream_request(&req, &config);

    assert_eq!(upstream.model, config.seedream_model);
    assert_eq!(upstream.prompt, "a cat\nAvoid: dogs");
    assert_eq!(upstream.sequential_image_generation.as_deref(), Some("disabled"));
    assert!(upstream.sequential_image_generation_options.is_none());
    assert_eq!(upstream.response_format.as_deref(), Some("url"));
    assert_eq!(upstream.size.as_deref(), Some("2K"));
    assert_eq!(upstream.stream, Some(false));
    assert_eq!(upstream.watermark, Some(false));
    assert_eq!(timeout_for(&req, &config), config.single_timeout());
}

#[test]
fn test_sequential_request_uses_default_max_images_and_long_timeout() {
    let config = UpstreamConfig::default();
    let req = request(json!({"prompt": "a story", "sequential_image_generation": "auto"}));
    let upstream = build_upstream_request(&req, &config);

    let options = upstream.sequential_image_generation_options.unwrap();
    assert_eq!(options.max_images, 4);
    assert_eq!(timeout_for(&req, &config), config.multi_timeout());
}

#[test]
fn test_service_forwards_and_reports_partial_failures() {
    let provider = Arc::new(RecordingProvider::new(json!({
        "model": "seedream-4-0-250828",
        "created": 1757000000,
        "data": [
            {"url": "https://cdn.example.com/1.png", "size": "2048x2048"},
            {"error": {"code": "OutputImageSensitiveContentDetected", "message": "blocked"}}
        ],
        "usage": {"generated_images": 1, "output_tokens": 16384, "total_tokens": 16384}
    })));
    let service = GenerationService::new(provider.clone(), UpstreamConfig::default());

    let req = request(json!({
        "prompt": "a story",
        "sequential_image_generation": "auto",
        "sequential_image_generation_options": {"max_images": 2}
    }));
    let result = tokio_test::block_on(service.generate(&req)).unwrap();

    assert_eq!(result.use_case, UseCase::Text2ImgMultiple);
    assert_eq!(result.data.len(), 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].index, 1);

    let seen = provider.seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0.sequential_image_generation.as_deref(), Some("auto"));
    assert_eq!(seen[0].1, Duration::from_secs(300));
}

#[test]
fn test_service_fails_when_every_image_failed() {
    let provider = Arc::new(RecordingProvider::new(json!({
        "data": [{"error": {"code": "InternalServiceError", "message": "boom"}}]
    })));
    let service = GenerationService::new(provider, UpstreamConfig::default());

    let err = tokio_test::block_on(service.generate(&request(json!({"prompt": "a cat"}))))
        .unwrap_err();
    match err {
        AppError::Upstream { message, .. } => assert_eq!(message, "InternalServiceError: boom"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_service_does_not_call_provider_on_invalid_request() {
    let provider = Arc::new(RecordingProvider::new(json!({"data": []})));
    let service = GenerationService::new(provider.clone(), UpstreamConfig::default());

    let result = tokio_test::block_on(service.generate(&request(json!({"prompt": ""}))));
    assert!(result.is_err());
    assert!(provider.seen.lock().is_empty());
}
