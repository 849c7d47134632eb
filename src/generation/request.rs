//! Unified generation request and its validation

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::response::{base64, ResponseFormat};
use crate::upstream::{ImageInput, SequentialOptions};

/// Longest accepted prompt, in characters
pub const MAX_PROMPT_CHARS: usize = 1000;

/// Most reference images the provider accepts in one call
pub const MAX_REFERENCE_IMAGES: usize = 10;

/// Most images a sequential generation may produce
pub const MAX_SEQUENTIAL_IMAGES: u32 = 15;

/// Reference images plus generated images may not exceed this
pub const MAX_TOTAL_IMAGES: usize = 15;

/// Largest edge accepted for an explicit `<W>x<H>` size
const MAX_EDGE: u32 = 4096;

const PRESET_SIZES: [&str; 3] = ["1K", "2K", "4K"];

/// Sequential generation mode
pub const SEQUENTIAL_AUTO: &str = "auto";
pub const SEQUENTIAL_DISABLED: &str = "disabled";

/// Request accepted by `/byteplus-generate` and `/byteplus-generate-image`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnifiedGenerationRequest {
    #[serde(default)]
    pub model: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub image: Option<ImageInput>,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub sequential_image_generation: Option<String>,
    #[serde(default)]
    pub sequential_image_generation_options: Option<SequentialOptions>,
    #[serde(default)]
    pub response_format: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default)]
    pub guidance_scale: Option<f32>,
    /// Accepted for dashboard compatibility, not forwarded
    #[serde(default)]
    pub steps: Option<u32>,
    #[serde(default)]
    pub stream: Option<bool>,
    #[serde(default)]
    pub watermark: Option<bool>,
}

impl UnifiedGenerationRequest {
    pub fn image_count(&self) -> usize {
        self.image.as_ref().map_or(0, |i| i.len())
    }

    /// True when sequential generation was requested
    pub fn is_sequential(&self) -> bool {
        self.sequential_image_generation
            .as_deref()
            .map_or(false, |mode| mode.eq_ignore_ascii_case(SEQUENTIAL_AUTO))
    }

    /// Check every optional field the caller supplied
    pub fn validate(&self) -> Result<()> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::InvalidRequest("Prompt cannot be empty".to_string()));
        }
        if prompt.chars().count() > MAX_PROMPT_CHARS {
            return Err(AppError::InvalidRequest(format!(
                "Prompt is too long (max {} characters)",
                MAX_PROMPT_CHARS
            )));
        }

        if let Some(model) = &self.model {
            if model.trim().is_empty() {
                return Err(AppError::InvalidRequest("Model cannot be empty".to_string()));
            }
        }

        if let Some(size) = &self.size {
            validate_size(size)?;
        }

        if let Some(mode) = &self.sequential_image_generation {
            if !mode.eq_ignore_ascii_case(SEQUENTIAL_AUTO)
                && !mode.eq_ignore_ascii_case(SEQUENTIAL_DISABLED)
            {
                return Err(AppError::InvalidRequest(format!(
                    "sequential_image_generation must be 'auto' or 'disabled', got '{}'",
                    mode
                )));
            }
        }

        if let Some(format) = &self.response_format {
            if ResponseFormat::parse(format).is_none() {
                return Err(AppError::InvalidRequest(format!(
                    "response_format must be 'url' or 'b64_json', got '{}'",
                    format
                )));
            }
        }

        if let Some(images) = &self.image {
            validate_images(images)?;
        }

        if let Some(options) = &self.sequential_image_generation_options {
            if options.max_images == 0 || options.max_images > MAX_SEQUENTIAL_IMAGES {
                return Err(AppError::InvalidRequest(format!(
                    "max_images must be between 1 and {}",
                    MAX_SEQUENTIAL_IMAGES
                )));
            }
            if self.is_sequential()
                && self.image_count() + options.max_images as usize > MAX_TOTAL_IMAGES
            {
                return Err(AppError::InvalidRequest(format!(
                    "Reference images plus max_images cannot exceed {}",
                    MAX_TOTAL_IMAGES
                )));
            }
        }

        if let Some(scale) = self.guidance_scale {
            if !(1.0..=10.0).contains(&scale) {
                return Err(AppError::InvalidRequest(
                    "guidance_scale must be between 1 and 10".to_string(),
                ));
            }
        }

        if let Some(seed) = self.seed {
            if !(-1..=i64::from(i32::MAX)).contains(&seed) {
                return Err(AppError::InvalidRequest(format!(
                    "seed must be between -1 and {}",
                    i32::MAX
                )));
            }
        }

        Ok(())
    }
}

/// Accepts `1K`/`2K`/`4K`, `adaptive`, or `<W>x<H>`
pub fn validate_size(size: &str) -> Result<()> {
    let size = size.trim();
    if PRESET_SIZES.iter().any(|p| p.eq_ignore_ascii_case(size))
        || size.eq_ignore_ascii_case("adaptive")
    {
        return Ok(());
    }

    let parsed = size
        .split_once(|c: char| c == 'x' || c == 'X')
        .and_then(|(w, h)| Some((w.parse::<u32>().ok()?, h.parse::<u32>().ok()?)));

    match parsed {
        Some((w, h)) if (1..=MAX_EDGE).contains(&w) && (1..=MAX_EDGE).contains(&h) => Ok(()),
        _ => Err(AppError::InvalidRequest(format!(
            "Invalid size '{}'. Use 1K, 2K, 4K, adaptive or <width>x<height>",
            size
        ))),
    }
}

fn validate_images(images: &ImageInput) -> Result<()> {
    if images.is_empty() {
        return Err(AppError::InvalidRequest(
            "image list cannot be empty; omit the field for text-to-image".to_string(),
        ));
    }
    if images.len() > MAX_REFERENCE_IMAGES {
        return Err(AppError::InvalidRequest(format!(
            "At most {} reference images are supported",
            MAX_REFERENCE_IMAGES
        )));
    }

    for (index, image) in images.iter().enumerate() {
        validate_image_ref(image, &format!("Reference image {}", index + 1))?;
    }

    Ok(())
}

/// Accepts an http(s) URL or a `data:image/<fmt>;base64,` string
pub fn validate_image_ref(image: &str, label: &str) -> Result<()> {
    let image = image.trim();
    if image.is_empty() {
        return Err(AppError::InvalidRequest(format!("{} is empty", label)));
    }
    if image.starts_with("data:") {
        if base64::get_format_from_data_url(image).is_none() || !base64::is_valid(image) {
            return Err(AppError::InvalidRequest(format!(
                "{} is not a valid base64 image data URL",
                label
            )));
        }
    } else if !image.starts_with("http://") && !image.starts_with("https://") {
        return Err(AppError::InvalidRequest(format!(
            "{} must be an http(s) URL or a data URL",
            label
        )));
    }
    Ok(())
}
