//! Forwarding of unified requests to the provider and response reshaping

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::request::{UnifiedGenerationRequest, SEQUENTIAL_AUTO, SEQUENTIAL_DISABLED};
use super::use_case::UseCase;
use crate::config::UpstreamConfig;
use crate::error::{AppError, Result};
use crate::response::ResponseFormat;
use crate::upstream::{
    ArkImageData, ArkImageRequest, ArkImageResponse, ArkUsage, ImageProvider, SequentialOptions,
};

/// `max_images` used when sequential mode is on but no options were sent
pub const DEFAULT_MAX_IMAGES: u32 = 4;

const DEFAULT_SIZE: &str = "2K";

/// A per-image failure reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageError {
    pub index: usize,
    pub code: Option<String>,
    pub message: String,
}

/// Reshaped answer of `/byteplus-generate`
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub model: Option<String>,
    pub created: Option<i64>,
    pub use_case: UseCase,
    pub data: Vec<ArkImageData>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ImageError>,
    pub usage: Option<ArkUsage>,
}

impl GenerationResult {
    /// Split provider items into images and per-image errors
    pub fn from_upstream(use_case: UseCase, response: ArkImageResponse) -> Result<Self> {
        let mut data = Vec::with_capacity(response.data.len());
        let mut errors = Vec::new();

        for (index, item) in response.data.into_iter().enumerate() {
            match item.error {
                Some(error) => errors.push(ImageError {
                    index,
                    code: error.code,
                    message: error.message,
                }),
                None if item.url.is_some() || item.b64_json.is_some() => data.push(item),
                None => {}
            }
        }

        if data.is_empty() {
            let message = errors
                .first()
                .map(|e| match &e.code {
                    Some(code) => format!("{}: {}", code, e.message),
                    None => e.message.clone(),
                })
                .unwrap_or_else(|| "Upstream returned no images".to_string());
            return Err(AppError::Upstream { status: 200, message });
        }

        Ok(Self {
            model: response.model,
            created: response.created,
            use_case,
            data,
            errors,
            usage: response.usage,
        })
    }
}

/// Translate a unified request into the provider payload
pub fn build_upstream_request(
    request: &UnifiedGenerationRequest,
    config: &UpstreamConfig,
) -> ArkImageRequest {
    let model = request
        .model
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| config.seedream_model.clone());

    let prompt = match request.negative_prompt.as_deref().map(str::trim) {
        Some(negative) if !negative.is_empty() => {
            format!("{}\nAvoid: {}", request.prompt.trim(), negative)
        }
        _ => request.prompt.trim().to_string(),
    };

    let sequential = request.is_sequential();
    let sequential_options = if sequential {
        Some(
            request
                .sequential_image_generation_options
                .clone()
                .unwrap_or(SequentialOptions {
                    max_images: DEFAULT_MAX_IMAGES,
                }),
        )
    } else {
        None
    };

    let mut upstream = ArkImageRequest::new(model, prompt);
    upstream.image = request.image.clone().map(|i| i.normalized());
    upstream.sequential_image_generation = Some(
        if sequential { SEQUENTIAL_AUTO } else { SEQUENTIAL_DISABLED }.to_string(),
    );
    upstream.sequential_image_generation_options = sequential_options;
    let response_format = request
        .response_format
        .as_deref()
        .and_then(ResponseFormat::parse)
        .unwrap_or(ResponseFormat::Url);
    upstream.response_format = Some(response_format.as_str().to_string());
    upstream.size = Some(request.size.clone().unwrap_or_else(|| DEFAULT_SIZE.to_string()));
    upstream.seed = request.seed;
    upstream.guidance_scale = request.guidance_scale;
    // The gateway always relays one aggregated JSON answer
    upstream.stream = Some(false);
    upstream.watermark = Some(request.watermark.unwrap_or(false));
    upstream
}

/// Upstream timeout for a request
pub fn timeout_for(request: &UnifiedGenerationRequest, config: &UpstreamConfig) -> Duration {
    if request.is_sequential() {
        config.multi_timeout()
    } else {
        config.single_timeout()
    }
}

/// Runs unified generation requests against a provider
pub struct GenerationService {
    provider: Arc<dyn ImageProvider>,
    config: UpstreamConfig,
}

impl GenerationService {
    pub fn new(provider: Arc<dyn ImageProvider>, config: UpstreamConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &Arc<dyn ImageProvider> {
        &self.provider
    }

    /// Validate, classify, forward and reshape
    pub async fn generate(&self, request: &UnifiedGenerationRequest) -> Result<GenerationResult> {
        request.validate()?;

        let use_case = UseCase::classify(request);
        if request.steps.is_some() {
            warn!(use_case = %use_case, "Ignoring unsupported 'steps' parameter");
        }
        if request.stream == Some(true) {
            info!(use_case = %use_case, "Streaming requested; relaying aggregated response");
        }

        let upstream = build_upstream_request(request, &self.config);
        let timeout = timeout_for(request, &self.config);

        info!(
            use_case = %use_case,
            label = use_case.label(),
            model = %upstream.model,
            images = request.image_count(),
            timeout_secs = timeout.as_secs(),
            "Forwarding generation request"
        );

        let response = self.provider.generate(upstream, timeout).await?;
        let result = GenerationResult::from_upstream(use_case, response)?;

        if !result.errors.is_empty() {
            warn!(
                use_case = %use_case,
                failed = result.errors.len(),
                generated = result.data.len(),
                "Some images failed upstream"
            );
        }

        Ok(result)
    }
}
