//! HTTP handlers

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::extract::{JsonBody, QueryParams};
use crate::error::Result;
use crate::generation::UnifiedGenerationRequest;
use crate::metrics::{Alert, ApiCallSample, CallAnnotation, MetricsSummary, SystemSample};
use crate::response::DirectImage;
use crate::workflows::{
    character::{self, CharaGeneratorRequest, CharaGeneratorResponse},
    planner::{self, StylePlanOutput, StylePlanRequest},
    product::{self, ProductGenerationRequest, ProductGenerationResponse},
};
use crate::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub upstream_configured: bool,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let provider = state.provider();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: provider.name().to_string(),
        upstream_configured: provider.is_configured(),
    })
}

/// `POST /byteplus-generate`
pub async fn byteplus_generate(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<UnifiedGenerationRequest>,
) -> Result<Response> {
    let result = state.generation.generate(&request).await?;
    let annotation = CallAnnotation {
        use_case: Some(result.use_case),
        images: result.data.len(),
    };

    let mut response = Json(result).into_response();
    response.extensions_mut().insert(annotation);
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct ImageIndexQuery {
    #[serde(default)]
    pub image_index: usize,
}

/// `POST /byteplus-generate-image?image_index=N`
pub async fn byteplus_generate_image(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<ImageIndexQuery>,
    JsonBody(request): JsonBody<UnifiedGenerationRequest>,
) -> Result<Response> {
    let result = state.generation.generate(&request).await?;
    let image = DirectImage::resolve(&result, query.image_index, state.provider()).await?;
    let annotation = CallAnnotation {
        use_case: Some(result.use_case),
        images: 1,
    };

    let mut response = image.into_response();
    response.extensions_mut().insert(annotation);
    Ok(response)
}

/// `POST /generate`
pub async fn generate_products(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<ProductGenerationRequest>,
) -> Result<Response> {
    let response: ProductGenerationResponse =
        product::generate_products(state.provider(), &state.settings.upstream, request).await?;
    let annotation = CallAnnotation {
        use_case: None,
        images: response.images_url.len(),
    };

    let mut response = Json(response).into_response();
    response.extensions_mut().insert(annotation);
    Ok(response)
}

/// `POST /plan`
pub async fn plan(
    JsonBody(request): JsonBody<StylePlanRequest>,
) -> Result<Json<StylePlanOutput>> {
    Ok(Json(planner::create_style_plan(request)?))
}

/// `POST /generate-chara`
pub async fn generate_chara(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<CharaGeneratorRequest>,
) -> Result<Response> {
    let upstream = &state.settings.upstream;
    let response: CharaGeneratorResponse =
        character::generate_character(state.provider(), upstream, request).await?;

    let mut response = Json(response).into_response();
    response.extensions_mut().insert(CallAnnotation {
        use_case: None,
        images: 1,
    });
    Ok(response)
}

/// `GET /metrics`
pub async fn metrics_summary(State(state): State<Arc<AppState>>) -> Json<MetricsSummary> {
    Json(state.metrics.summary())
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// `GET /metrics/history`
pub async fn metrics_history(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<LimitQuery>,
) -> Json<Vec<ApiCallSample>> {
    Json(state.metrics.recent(query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT)))
}

/// `GET /metrics/errors`
pub async fn metrics_errors(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<LimitQuery>,
) -> Json<Vec<ApiCallSample>> {
    Json(state.metrics.errors(query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT)))
}

/// `GET /metrics/system`
pub async fn metrics_system(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<LimitQuery>,
) -> Json<Vec<SystemSample>> {
    Json(state.metrics.system_history(query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT)))
}

/// `GET /metrics/alerts`
pub async fn metrics_alerts(State(state): State<Arc<AppState>>) -> Json<Vec<Alert>> {
    Json(state.metrics.alerts())
}

/// `GET /metrics/recommendations`
pub async fn metrics_recommendations(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.metrics.recommendations())
}

/// `GET /metrics/export.csv`
pub async fn metrics_export(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let filename = format!(
        "attachment; filename=\"performance_metrics_{}.csv\"",
        Utc::now().format("%Y%m%d_%H%M%S")
    );

    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        state.metrics.to_csv(),
    )
}

/// `DELETE /metrics`
pub async fn metrics_clear(State(state): State<Arc<AppState>>) -> StatusCode {
    state.metrics.clear();
    StatusCode::NO_CONTENT
}
