//! Base64 decoding utilities for data URLs and `b64_json` payloads

use base64::{engine::general_purpose::STANDARD, Engine};
use crate::error::{AppError, Result};

/// Strip a `data:...;base64,` prefix if present
fn payload(encoded: &str) -> &str {
    if encoded.starts_with("data:") {
        encoded.split_once(',').map(|(_, data)| data).unwrap_or(encoded)
    } else {
        encoded
    }
}

/// Decode base64 string to binary data
pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(payload(encoded).trim())
        .map_err(|e| AppError::InvalidRequest(format!("Invalid base64 data: {}", e)))
}

/// Check if a string is valid base64
pub fn is_valid(data: &str) -> bool {
    STANDARD.decode(payload(data).trim()).is_ok()
}

/// Get the image format from base64 data URL prefix
pub fn get_format_from_data_url(data_url: &str) -> Option<&str> {
    let rest = data_url.strip_prefix("data:image/")?;
    let end = rest.find(';')?;
    let format = &rest[..end];
    if format.is_empty() {
        None
    } else {
        Some(format)
    }
}
