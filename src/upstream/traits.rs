//! Wire types for the ModelArk image API and the provider trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::{AppError, Result};

/// One or more reference images, as a URL or a `data:image/...;base64,` string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageInput {
    Single(String),
    Multiple(Vec<String>),
}

impl ImageInput {
    pub fn len(&self) -> usize {
        match self {
            ImageInput::Single(_) => 1,
            ImageInput::Multiple(images) => images.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        let items: Vec<&String> = match self {
            ImageInput::Single(image) => vec![image],
            ImageInput::Multiple(images) => images.iter().collect(),
        };
        items.into_iter()
    }

    /// Collapse a one-element list to a plain string, which is what
    /// the single-reference models expect
    pub fn normalized(self) -> Self {
        match self {
            ImageInput::Multiple(mut images) if images.len() == 1 => {
                ImageInput::Single(images.remove(0))
            }
            other => other,
        }
    }
}

/// Sequential (multi-image) generation options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequentialOptions {
    pub max_images: u32,
}

/// Body of `POST /images/generations`
#[derive(Debug, Clone, Serialize)]
pub struct ArkImageRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequential_image_generation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequential_image_generation_options: Option<SequentialOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance_scale: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<bool>,
}

impl ArkImageRequest {
    /// A bare request with only model and prompt set
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            image: None,
            sequential_image_generation: None,
            sequential_image_generation_options: None,
            response_format: None,
            size: None,
            seed: None,
            guidance_scale: None,
            stream: None,
            watermark: None,
        }
    }
}

/// Error object as returned by ModelArk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArkError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// One generated image, or a per-image failure in sequential mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArkImageData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ArkError>,
}

impl ArkImageData {
    pub fn is_image(&self) -> bool {
        self.error.is_none() && (self.url.is_some() || self.b64_json.is_some())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArkUsage {
    #[serde(default)]
    pub generated_images: u32,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Response of `POST /images/generations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArkImageResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub data: Vec<ArkImageData>,
    #[serde(default)]
    pub usage: Option<ArkUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ArkError>,
}

impl ArkImageResponse {
    /// URL of the first successfully generated image
    pub fn first_url(&self) -> Result<String> {
        self.data
            .iter()
            .filter(|d| d.error.is_none())
            .find_map(|d| d.url.clone())
            .ok_or_else(|| AppError::Upstream {
                status: 200,
                message: "Upstream returned no image URL".to_string(),
            })
    }

    /// Lossless JSON view, used when relaying the raw provider answer
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A downloaded image
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Trait for image generation providers
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Provider name used in logs and health output
    fn name(&self) -> &str;

    /// Whether credentials are present
    fn is_configured(&self) -> bool;

    /// Run one generation call
    async fn generate(
        &self,
        request: ArkImageRequest,
        timeout: Duration,
    ) -> Result<ArkImageResponse>;

    /// Download a generated image by URL
    async fn fetch_image(&self, url: &str) -> Result<FetchedImage>;
}
