//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the ModelArk API key
pub const ARK_API_KEY_ENV: &str = "ARK_API_KEY";

/// Environment variable holding the Seedream endpoint/model id
pub const SEEDREAM_MODEL_ENV: &str = "SEEDREAM_MODEL_ID";

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Hard ceiling for any inbound request, upstream time included
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Largest accepted request body; reference images arrive as data URLs
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_max_body_bytes() -> usize {
    64 * 1024 * 1024
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8003
}

fn default_request_timeout() -> u64 {
    330
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub api_keys: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_keys: vec![],
        }
    }
}

fn default_true() -> bool {
    true
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: default_rps(),
            burst_size: default_burst(),
        }
    }
}

fn default_rps() -> u32 {
    100
}

fn default_burst() -> u32 {
    200
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `json` or `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// BytePlus ModelArk configuration
#[derive(Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model (or endpoint id) used for Seedream text/image-to-image calls
    #[serde(default = "default_seedream_model")]
    pub seedream_model: String,
    /// Model used for SeedEdit refinement and character edits
    #[serde(default = "default_seededit_model")]
    pub seededit_model: String,
    #[serde(default = "default_single_timeout")]
    pub single_timeout_secs: u64,
    #[serde(default = "default_multi_timeout")]
    pub multi_timeout_secs: u64,
    /// Timeout for downloading a generated image by URL
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Upstream calls a single workflow request may have in flight
    #[serde(default = "default_workflow_concurrency")]
    pub workflow_concurrency: usize,
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("seedream_model", &self.seedream_model)
            .field("seededit_model", &self.seededit_model)
            .field("single_timeout_secs", &self.single_timeout_secs)
            .field("multi_timeout_secs", &self.multi_timeout_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("workflow_concurrency", &self.workflow_concurrency)
            .finish()
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            seedream_model: default_seedream_model(),
            seededit_model: default_seededit_model(),
            single_timeout_secs: default_single_timeout(),
            multi_timeout_secs: default_multi_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
            workflow_concurrency: default_workflow_concurrency(),
        }
    }
}

impl UpstreamConfig {
    pub fn single_timeout(&self) -> Duration {
        Duration::from_secs(self.single_timeout_secs)
    }

    pub fn multi_timeout(&self) -> Duration {
        Duration::from_secs(self.multi_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Whether a non-empty API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().map_or(false, |k| !k.trim().is_empty())
    }
}

fn default_base_url() -> String {
    "https://ark.ap-southeast.bytepluses.com/api/v3".to_string()
}

fn default_seedream_model() -> String {
    "seedream-4-0-250828".to_string()
}

fn default_seededit_model() -> String {
    "seededit-3-0-i2i-250628".to_string()
}

fn default_single_timeout() -> u64 {
    120
}

fn default_multi_timeout() -> u64 {
    300
}

fn default_fetch_timeout() -> u64 {
    60
}

fn default_workflow_concurrency() -> usize {
    4
}

/// Performance metrics configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Number of API call samples kept in memory
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Number of failed calls kept in the error log
    #[serde(default = "default_max_errors")]
    pub max_errors: usize,
    /// Window used for throughput and error rate
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u64,
    /// Append every sample to this CSV file when set
    #[serde(default)]
    pub csv_path: Option<String>,
    /// Seconds between CPU/memory samples, 0 turns sampling off
    #[serde(default = "default_system_interval")]
    pub system_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            max_errors: default_max_errors(),
            window_minutes: default_window_minutes(),
            csv_path: None,
            system_interval_secs: default_system_interval(),
        }
    }
}

fn default_max_history() -> usize {
    1000
}

fn default_max_errors() -> usize {
    200
}

fn default_window_minutes() -> u64 {
    5
}

fn default_system_interval() -> u64 {
    5
}

/// Static dashboard configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DashboardConfig {
    /// Directory with a prebuilt dashboard, served at `/`
    #[serde(default)]
    pub static_dir: Option<String>,
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("auth.enabled", true)?
            .set_default("rate_limit.enabled", true)?
            .set_default("rate_limit.requests_per_second", default_rps() as i64)?
            .set_default("rate_limit.burst_size", default_burst() as i64)?
            .add_source(
                File::with_name(path.as_ref().to_str().unwrap_or("config/default"))
                    .required(false),
            )
            // Override with environment variables (prefixed with SEEDREAM_GATEWAY__)
            .add_source(
                Environment::with_prefix("SEEDREAM_GATEWAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;
        settings.apply_ark_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Apply the ModelArk conventional variables (`ARK_API_KEY`, `SEEDREAM_MODEL_ID`)
    pub fn apply_ark_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ARK_API_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            self.upstream.api_key = Some(key);
        }
        if let Some(model) = lookup(SEEDREAM_MODEL_ENV).filter(|v| !v.trim().is_empty()) {
            self.upstream.seedream_model = model;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }

        if self.server.max_body_bytes == 0 {
            return Err(invalid("server.max_body_bytes must be greater than 0"));
        }

        if !self.upstream.base_url.starts_with("http://")
            && !self.upstream.base_url.starts_with("https://")
        {
            return Err(invalid(format!(
                "Upstream base_url '{}' must be an http(s) URL",
                self.upstream.base_url
            )));
        }

        if self.upstream.seedream_model.trim().is_empty()
            || self.upstream.seededit_model.trim().is_empty()
        {
            return Err(invalid("Upstream model ids cannot be empty"));
        }

        if self.upstream.single_timeout_secs == 0
            || self.upstream.multi_timeout_secs == 0
            || self.upstream.fetch_timeout_secs == 0
        {
            return Err(invalid("Upstream timeouts must be greater than 0"));
        }

        if self.upstream.workflow_concurrency == 0 {
            return Err(invalid("upstream.workflow_concurrency must be greater than 0"));
        }

        if self.metrics.max_history == 0 {
            return Err(invalid("metrics.max_history must be greater than 0"));
        }

        if self.metrics.window_minutes == 0 {
            return Err(invalid("metrics.window_minutes must be greater than 0"));
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err(invalid(format!(
                "Invalid log format '{}'. Must be 'json' or 'pretty'",
                self.logging.format
            )));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::Config(config::ConfigError::Message(message.into()))
}
