//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the relay endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::protocol::{
    AnalyzeImageBody, ErrorBody, GenerateImageBody, ImageResponse, ModelCatalogResponse,
    ModelEntry,
};
use crate::web::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use image_prompt_core::catalog::{self, ANALYSIS_MODELS, IMAGE_MODELS};
use image_prompt_core::ports::{AnalyzeRequest, ImageJobRequest};
use image_prompt_core::{AnalysisResult, PromptOption};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        analyze_image_handler,
        generate_image_handler,
        list_models_handler,
        list_options_handler,
        health_handler,
    ),
    components(
        schemas(
            AnalyzeImageBody,
            GenerateImageBody,
            ImageResponse,
            ErrorBody,
            ModelEntry,
            ModelCatalogResponse,
            HealthResponse
        )
    ),
    tags(
        (name = "Image Prompt Relay", description = "Relays image analysis and image generation to the AI gateway.")
    )
)]
pub struct ApiDoc;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    #[serde(rename = "promptSchema")]
    prompt_schema: String,
}

//=========================================================================================
// Relay Handlers
//=========================================================================================

/// Describe an uploaded image as a bilingual prompt.
///
/// The response is either the structured shape (`titleAr`, `titleEn`,
/// `overviewAr`, `overviewEn`, `sections`) or the flat shape (`promptAr`,
/// `promptEn`), depending on how the relay is deployed.
#[utoipa::path(
    post,
    path = "/analyze-image",
    request_body = AnalyzeImageBody,
    responses(
        (status = 200, description = "The bilingual prompt"),
        (status = 400, description = "Missing or malformed image", body = ErrorBody),
        (status = 402, description = "Gateway credit exhausted", body = ErrorBody),
        (status = 429, description = "Gateway rate limit hit", body = ErrorBody),
        (status = 500, description = "Gateway or relay failure", body = ErrorBody)
    )
)]
pub async fn analyze_image_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeImageBody>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request_id = Uuid::new_v4();
    let request = AnalyzeRequest::from(body);
    info!(%request_id, aspects = request.options.len(), "analyze-image request received");

    let result = app_state.analyzer.analyze(&request).await.map_err(|e| {
        warn!(%request_id, error = %e, "analyze-image request failed");
        ApiError::from(e)
    })?;
    Ok(Json(result))
}

/// Generate a new image from a prompt, or edit an existing one.
#[utoipa::path(
    post,
    path = "/generate-image",
    request_body = GenerateImageBody,
    responses(
        (status = 200, description = "The rendered image", body = ImageResponse),
        (status = 400, description = "Invalid action or missing image", body = ErrorBody),
        (status = 402, description = "Gateway credit exhausted", body = ErrorBody),
        (status = 429, description = "Gateway rate limit hit", body = ErrorBody),
        (status = 500, description = "Gateway failure or no image generated", body = ErrorBody)
    )
)]
pub async fn generate_image_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<GenerateImageBody>, JsonRejection>,
) -> Result<Json<ImageResponse>, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request_id = Uuid::new_v4();
    let request = ImageJobRequest::try_from(body)?;
    info!(%request_id, action = request.job.action(), "generate-image request received");

    let rendered = app_state.generator.render(&request).await.map_err(|e| {
        warn!(%request_id, error = %e, "generate-image request failed");
        ApiError::from(e)
    })?;
    Ok(Json(ImageResponse::from(rendered)))
}

/// Answers CORS preflight requests with an empty 200.
pub async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

//=========================================================================================
// Catalog Handlers
//=========================================================================================

/// List the selectable analysis and image models.
#[utoipa::path(
    get,
    path = "/models",
    responses((status = 200, description = "The model catalogs", body = ModelCatalogResponse))
)]
pub async fn list_models_handler(State(app_state): State<Arc<AppState>>) -> Json<ModelCatalogResponse> {
    Json(ModelCatalogResponse {
        analysis_models: ANALYSIS_MODELS.iter().map(ModelEntry::from).collect(),
        image_models: IMAGE_MODELS.iter().map(ModelEntry::from).collect(),
        default_analysis_model: catalog::DEFAULT_CLIENT_ANALYSIS_MODEL.to_string(),
        default_image_model: catalog::DEFAULT_IMAGE_MODEL.to_string(),
        relay_analysis_model: app_state.config.analysis_model.clone(),
        relay_image_model: app_state.config.image_model.clone(),
    })
}

/// List the prompt options with their default enabled state.
#[utoipa::path(
    get,
    path = "/options",
    responses((status = 200, description = "The option catalog"))
)]
pub async fn list_options_handler() -> Json<Vec<PromptOption>> {
    Json(catalog::default_options())
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The relay is up", body = HealthResponse))
)]
pub async fn health_handler(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        prompt_schema: app_state.config.prompt_schema.to_string(),
    })
}
