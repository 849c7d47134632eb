//! Direct image responses for `/byteplus-generate-image`

use axum::{
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::error::{AppError, Result};
use crate::generation::{GenerationResult, UseCase};
use crate::response::base64;
use crate::upstream::ImageProvider;

pub const X_TOTAL_IMAGES: &str = "x-total-images";
pub const X_IMAGE_INDEX: &str = "x-image-index";
pub const X_USE_CASE: &str = "x-use-case";

/// Detect image format from binary data using magic bytes
pub fn detect_image_format(data: &[u8]) -> Option<&'static str> {
    if data.len() < 8 {
        return None;
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("png");
    }

    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("jpeg");
    }

    // GIF: GIF87a or GIF89a
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some("gif");
    }

    // WebP: RIFF....WEBP
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some("webp");
    }

    // BMP: BM
    if data.starts_with(b"BM") {
        return Some("bmp");
    }

    None
}

/// MIME type for raw image bytes, preferring sniffed content over the hint
pub fn content_type_for(data: &[u8], hint: Option<&str>) -> String {
    match detect_image_format(data) {
        Some(format) => format!("image/{}", format),
        None => hint
            .filter(|h| h.starts_with("image/"))
            .map(|h| h.to_string())
            .unwrap_or_else(|| "image/png".to_string()),
    }
}

/// A single generated image returned as raw bytes
#[derive(Debug, Clone)]
pub struct DirectImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub index: usize,
    pub total: usize,
    pub use_case: UseCase,
}

impl DirectImage {
    /// Pick image `index` out of a generation result, downloading it if
    /// the provider answered with a URL
    pub async fn resolve(
        result: &GenerationResult,
        index: usize,
        provider: &dyn ImageProvider,
    ) -> Result<Self> {
        let total = result.data.len();
        let item = result.data.get(index).ok_or_else(|| {
            AppError::ImageNotFound(format!(
                "image_index {} is out of range ({} image(s) generated)",
                index, total
            ))
        })?;

        let (bytes, hint) = if let Some(b64) = &item.b64_json {
            (base64::decode(b64)?, None)
        } else if let Some(url) = &item.url {
            let fetched = provider.fetch_image(url).await?;
            (fetched.bytes, fetched.content_type)
        } else {
            return Err(AppError::ImageNotFound(format!("image {} has no data", index)));
        };

        let content_type = content_type_for(&bytes, hint.as_deref());
        debug!(
            index,
            total,
            size = bytes.len(),
            content_type = %content_type,
            "Resolved direct image"
        );

        Ok(Self {
            bytes,
            content_type,
            index,
            total,
            use_case: result.use_case,
        })
    }
}

impl IntoResponse for DirectImage {
    fn into_response(self) -> Response {
        let headers = [
            (header::CONTENT_TYPE, header_value(&self.content_type)),
            (HeaderName::from_static(X_TOTAL_IMAGES), HeaderValue::from(self.total)),
            (HeaderName::from_static(X_IMAGE_INDEX), HeaderValue::from(self.index)),
            (HeaderName::from_static(X_USE_CASE), HeaderValue::from_static(self.use_case.as_str())),
        ];

        (StatusCode::OK, headers, self.bytes).into_response()
    }
}

fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}
