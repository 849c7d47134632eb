//! BytePlus ModelArk HTTP client

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::error::{AppError, Result};
use crate::upstream::traits::{ArkImageRequest, ArkImageResponse, FetchedImage, ImageProvider};

const GENERATIONS_PATH: &str = "/images/generations";

/// Upstream error bodies are cut to this many characters
const MAX_ERROR_BODY: usize = 500;

/// Client for the ModelArk image generation API
pub struct ArkClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    fetch_timeout: Duration,
}

impl ArkClient {
    /// Create a new client from configuration
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            fetch_timeout: config.fetch_timeout(),
        })
    }

    fn generations_url(&self) -> String {
        format!("{}{}", self.base_url, GENERATIONS_PATH)
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            AppError::AuthenticationFailed(
                "ModelArk API key is not configured (set ARK_API_KEY)".to_string(),
            )
        })
    }
}

/// Map a transport failure to the matching gateway error
fn transport_error(e: reqwest::Error, target: &str) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(format!("Request to {} timed out", target))
    } else if e.is_connect() {
        AppError::UpstreamUnavailable(format!("Connection failed to {}: {}", target, e))
    } else {
        AppError::HttpClient(e)
    }
}

/// Pull a readable message out of an upstream error body
pub fn extract_error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        let error = v.get("error")?;
        let message = error.get("message").and_then(|m| m.as_str());
        let code = error.get("code").and_then(|c| c.as_str());
        match (code, message) {
            (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
            (None, Some(message)) => Some(message.to_string()),
            (Some(code), None) => Some(code.to_string()),
            (None, None) => None,
        }
    });

    match message {
        Some(message) => message,
        None => body.chars().take(MAX_ERROR_BODY).collect(),
    }
}

#[async_trait]
impl ImageProvider for ArkClient {
    fn name(&self) -> &str {
        "byteplus-ark"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(
        &self,
        request: ArkImageRequest,
        timeout: Duration,
    ) -> Result<ArkImageResponse> {
        let url = self.generations_url();
        let api_key = self.api_key()?;
        let started = Instant::now();

        debug!(
            model = %request.model,
            has_image = request.image.is_some(),
            sequential = ?request.sequential_image_generation,
            "Sending generation request upstream"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, &url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body);
            warn!(status = %status, error = %message, "Upstream generation failed");
            return Err(AppError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: ArkImageResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })?;

        if let Some(error) = &body.error {
            warn!(code = ?error.code, error = %error.message, "Upstream reported an error");
            return Err(AppError::Upstream {
                status: status.as_u16(),
                message: match &error.code {
                    Some(code) => format!("{}: {}", code, error.message),
                    None => error.message.clone(),
                },
            });
        }

        debug!(
            images = body.data.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upstream generation completed"
        );

        Ok(body)
    }

    async fn fetch_image(&self, url: &str) -> Result<FetchedImage> {
        let response = self
            .client
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, url))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
            // Generated URLs are signed and expire
            return Err(AppError::ImageNotFound(format!(
                "Image URL is no longer available ({})",
                status
            )));
        }
        if !status.is_success() {
            return Err(AppError::Upstream {
                status: status.as_u16(),
                message: format!("Image download failed for {}", url),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let bytes = response.bytes().await.map_err(|e| transport_error(e, url))?;

        debug!(size = bytes.len(), "Fetched generated image");

        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
