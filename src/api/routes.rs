//! Router assembly

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use super::handlers;
use crate::middleware::{AuthLayer, RateLimitLayer, TimingLayer};
use crate::AppState;

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let settings = state.settings.clone();

    let mut api = Router::new()
        .route("/byteplus-generate", post(handlers::byteplus_generate))
        .route("/byteplus-generate-image", post(handlers::byteplus_generate_image))
        .route("/generate", post(handlers::generate_products))
        .route("/plan", post(handlers::plan))
        .route("/generate-chara", post(handlers::generate_chara))
        .route(
            "/metrics",
            get(handlers::metrics_summary).delete(handlers::metrics_clear),
        )
        .route("/metrics/history", get(handlers::metrics_history))
        .route("/metrics/errors", get(handlers::metrics_errors))
        .route("/metrics/system", get(handlers::metrics_system))
        .route("/metrics/alerts", get(handlers::metrics_alerts))
        .route("/metrics/recommendations", get(handlers::metrics_recommendations))
        .route("/metrics/export.csv", get(handlers::metrics_export))
        .layer(DefaultBodyLimit::max(settings.server.max_body_bytes));

    if settings.rate_limit.enabled {
        api = api.layer(RateLimitLayer::new(
            settings.rate_limit.requests_per_second,
            settings.rate_limit.burst_size,
        ));
    }

    if settings.auth.enabled {
        api = api.layer(AuthLayer::new(settings.auth.api_keys.clone()));
    }

    // Outermost, so rejected calls show up in the error log too
    api = api.layer(TimingLayer::new(state.metrics.clone()));

    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .merge(api);

    if let Some(dir) = &settings.dashboard.static_dir {
        info!(dir = %dir, "Serving dashboard static files");
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(TimeoutLayer::new(Duration::from_secs(
        settings.server.request_timeout_secs,
    )))
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
    .with_state(state)
}
