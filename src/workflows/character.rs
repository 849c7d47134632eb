//! Character generation from a style plan

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::planner::{validate_strength, StylePayload};
use super::{seededit_request, seedream_request, CHARACTER_GUIDANCE};
use crate::config::UpstreamConfig;
use crate::error::{AppError, Result};
use crate::generation::request::validate_image_ref;
use crate::upstream::ImageProvider;

#[derive(Debug, Clone, Deserialize)]
pub struct CharaGeneratorRequest {
    pub final_prompt: String,
    pub strength: f32,
    #[serde(default)]
    pub input_image: Option<String>,
    /// Output of `/plan`; either payload variant is accepted
    #[serde(default, alias = "seedream_payload")]
    pub seededit_payload: Option<StylePayload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CharaGeneratorResponse {
    pub output_image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seedream_response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seededit_response: Option<Value>,
}

/// Prompt sent upstream: the style prompt followed by the identity
/// constraints and strength
pub fn compose_prompt(request: &CharaGeneratorRequest) -> String {
    let constraints = request
        .seededit_payload
        .as_ref()
        .map(|p| p.preserve_identity.as_slice())
        .unwrap_or_default();

    let mut prompt = request.final_prompt.trim().to_string();
    if !constraints.is_empty() {
        prompt.push_str("\nConstraints: ");
        prompt.push_str(&constraints.join(", "));
    }
    prompt.push_str(&format!("\nStrength: {}", request.strength));
    prompt
}

/// Edit the input image with SeedEdit, or generate from scratch with
/// Seedream when there is none
pub async fn generate_character(
    provider: &dyn ImageProvider,
    config: &UpstreamConfig,
    request: CharaGeneratorRequest,
) -> Result<CharaGeneratorResponse> {
    if request.final_prompt.trim().is_empty() {
        return Err(AppError::InvalidRequest("final_prompt cannot be empty".to_string()));
    }
    validate_strength(request.strength)?;

    let prompt = compose_prompt(&request);
    let input_image = request.input_image.filter(|i| !i.trim().is_empty());

    match input_image {
        Some(image) => {
            validate_image_ref(&image, "input_image")?;
            info!(model = %config.seededit_model, "Generating character with SeedEdit");
            let response = provider
                .generate(seededit_request(config, prompt, image), config.single_timeout())
                .await?;
            Ok(CharaGeneratorResponse {
                output_image_url: response.first_url()?,
                seedream_response: None,
                seededit_response: Some(response.to_value()),
            })
        }
        None => {
            info!(model = %config.seedream_model, "Generating character with Seedream");
            let response = provider
                .generate(
                    seedream_request(config, prompt, CHARACTER_GUIDANCE),
                    config.single_timeout(),
                )
                .await?;
            Ok(CharaGeneratorResponse {
                output_image_url: response.first_url()?,
                seedream_response: Some(response.to_value()),
                seededit_response: None,
            })
        }
    }
}
