//! Response handling module - Base64 payloads and direct image responses

pub mod base64;
pub mod image;

pub use image::{content_type_for, detect_image_format, DirectImage};

/// Response format options understood by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Base64 encoded JSON
    Base64Json,
    /// URL to the generated image
    Url,
}

impl ResponseFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "b64_json" | "base64" => Some(Self::Base64Json),
            "url" => Some(Self::Url),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base64Json => "b64_json",
            Self::Url => "url",
        }
    }
}
