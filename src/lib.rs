//! Seedream Gateway
//!
//! An HTTP gateway in front of the BytePlus ModelArk image API. It accepts a
//! unified request schema, picks one of the five Seedream use cases, relays the
//! call upstream and keeps a bounded performance log for the dashboard.

pub mod api;
pub mod config;
pub mod error;
pub mod generation;
pub mod metrics;
pub mod middleware;
pub mod response;
pub mod upstream;
pub mod workflows;

pub use error::{AppError, Result};

use std::sync::Arc;

use generation::GenerationService;
use metrics::MetricsRecorder;
use upstream::ImageProvider;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub generation: Arc<GenerationService>,
    pub metrics: Arc<MetricsRecorder>,
}

impl AppState {
    pub fn new(
        settings: config::Settings,
        provider: Arc<dyn ImageProvider>,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        let generation = Arc::new(GenerationService::new(provider, settings.upstream.clone()));
        Self {
            settings: Arc::new(settings),
            generation,
            metrics,
        }
    }

    pub fn provider(&self) -> &dyn ImageProvider {
        self.generation.provider().as_ref()
    }
}
