//! Style planning: merge identity constraints and a style prompt into a
//! ready-to-send payload

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::generation::request::validate_image_ref;

#[derive(Debug, Clone, Deserialize)]
pub struct StylePlanRequest {
    pub final_prompt: String,
    pub strength: f32,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Payload handed to the character generator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StylePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_image: Option<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub strength: f32,
    #[serde(default)]
    pub preserve_identity: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StylePlanOutput {
    pub prompt: String,
    pub strength: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seedream_payload: Option<StylePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seededit_payload: Option<StylePayload>,
}

pub fn validate_strength(strength: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&strength) {
        return Err(AppError::InvalidRequest(
            "strength must be between 0.0 and 1.0".to_string(),
        ));
    }
    Ok(())
}

/// Build a Seedream payload, or a SeedEdit payload when a source image is given
pub fn create_style_plan(request: StylePlanRequest) -> Result<StylePlanOutput> {
    if request.final_prompt.trim().is_empty() {
        return Err(AppError::InvalidRequest("final_prompt cannot be empty".to_string()));
    }
    validate_strength(request.strength)?;

    let preserve_identity: Vec<String> = request
        .constraints
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect();

    let image_url = request.image_url.filter(|u| !u.trim().is_empty());

    match image_url {
        None => Ok(StylePlanOutput {
            prompt: request.final_prompt.clone(),
            strength: request.strength,
            image_url: None,
            seedream_payload: Some(StylePayload {
                input_image: None,
                prompt: request.final_prompt,
                strength: request.strength,
                preserve_identity,
            }),
            seededit_payload: None,
        }),
        Some(image_url) => {
            validate_image_ref(&image_url, "image_url")?;
            Ok(StylePlanOutput {
                prompt: request.final_prompt.clone(),
                strength: request.strength,
                image_url: Some(image_url.clone()),
                seedream_payload: None,
                seededit_payload: Some(StylePayload {
                    input_image: Some(image_url),
                    prompt: request.final_prompt,
                    strength: request.strength,
                    preserve_identity,
                }),
            })
        }
    }
}
