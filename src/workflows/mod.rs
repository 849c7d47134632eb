//! Workflows module - Fixed multi-step pipelines built on the provider

pub mod character;
pub mod planner;
pub mod product;

use crate::config::UpstreamConfig;
use crate::upstream::{ArkImageRequest, ImageInput};

/// Seed used for reproducible Seedream calls
pub const FIXED_SEED: i64 = 42;

pub const PRODUCT_GUIDANCE: f32 = 5.5;
pub const CHARACTER_GUIDANCE: f32 = 6.0;
pub const SEEDEDIT_GUIDANCE: f32 = 1.1;

const SEEDREAM_SIZE: &str = "1024x1024";
const SEEDEDIT_SIZE: &str = "adaptive";

/// Text-to-image call on the Seedream model
pub(crate) fn seedream_request(
    config: &UpstreamConfig,
    prompt: String,
    guidance: f32,
) -> ArkImageRequest {
    let mut request = ArkImageRequest::new(config.seedream_model.clone(), prompt);
    request.response_format = Some("url".to_string());
    request.size = Some(SEEDREAM_SIZE.to_string());
    request.guidance_scale = Some(guidance);
    request.seed = Some(FIXED_SEED);
    request.watermark = Some(false);
    request
}

/// Image edit call on the SeedEdit model
pub(crate) fn seededit_request(
    config: &UpstreamConfig,
    prompt: String,
    image: String,
) -> ArkImageRequest {
    let mut request = ArkImageRequest::new(config.seededit_model.clone(), prompt);
    request.image = Some(ImageInput::Single(image));
    request.response_format = Some("url".to_string());
    request.size = Some(SEEDEDIT_SIZE.to_string());
    request.guidance_scale = Some(SEEDEDIT_GUIDANCE);
    request.watermark = Some(false);
    request
}
