//! Product photo batch: Seedream generation followed by a SeedEdit touch-up

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{seededit_request, seedream_request, PRODUCT_GUIDANCE};
use crate::config::UpstreamConfig;
use crate::error::{AppError, Result};
use crate::upstream::ImageProvider;

/// Largest batch accepted by `/generate`
pub const MAX_PRODUCT_PROMPTS: usize = 20;

/// Fixed instruction for the refinement pass
pub const REFINE_PROMPT: &str =
    "Enhance the quality of the image by improving accuracy of packaging or lighting.";

#[derive(Debug, Clone, Deserialize)]
pub struct ProductGenerationRequest {
    #[serde(default)]
    pub prompts: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductGenerationResponse {
    pub images_url: Vec<String>,
}

pub fn product_prompt(prompt: &str) -> String {
    format!(
        "Generate a high-quality, production-grade product photo of {}",
        prompt.trim()
    )
}

async fn generate_one(
    provider: &dyn ImageProvider,
    config: &UpstreamConfig,
    prompt: &str,
) -> Result<String> {
    let draft = provider
        .generate(
            seedream_request(config, product_prompt(prompt), PRODUCT_GUIDANCE),
            config.single_timeout(),
        )
        .await?;
    let draft_url = draft.first_url()?;
    debug!(url = %draft_url, "Product draft generated");

    let refined = provider
        .generate(
            seededit_request(config, REFINE_PROMPT.to_string(), draft_url),
            config.single_timeout(),
        )
        .await?;
    refined.first_url()
}

/// Generate one refined image URL per prompt, in prompt order
pub async fn generate_products(
    provider: &dyn ImageProvider,
    config: &UpstreamConfig,
    request: ProductGenerationRequest,
) -> Result<ProductGenerationResponse> {
    if request.prompts.is_empty() {
        return Err(AppError::InvalidRequest("At least one prompt is required.".to_string()));
    }
    if request.prompts.iter().any(|p| p.trim().is_empty()) {
        return Err(AppError::InvalidRequest("Prompts cannot be empty.".to_string()));
    }
    if request.prompts.len() > MAX_PRODUCT_PROMPTS {
        return Err(AppError::InvalidRequest(format!(
            "At most {} prompts are accepted per request.",
            MAX_PRODUCT_PROMPTS
        )));
    }

    let concurrency = config.workflow_concurrency.max(1);
    info!(
        prompts = request.prompts.len(),
        concurrency, "Generating product images"
    );

    // `buffered` keeps prompt order while capping in-flight prompts
    let pending: Vec<_> = request
        .prompts
        .iter()
        .map(|prompt| generate_one(provider, config, prompt))
        .collect();
    let images_url: Vec<String> = stream::iter(pending)
        .buffered(concurrency)
        .try_collect()
        .await?;

    Ok(ProductGenerationResponse { images_url })
}
