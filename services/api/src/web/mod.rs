pub mod protocol;
pub mod rest;
pub mod state;

use crate::web::rest::{
    analyze_image_handler, generate_image_handler, health_handler, list_models_handler,
    list_options_handler, preflight_handler, ApiDoc,
};
use crate::web::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, Method,
    },
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Builds the full application router: relay routes, catalog routes and Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Browsers call the relays directly from any origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ]);

    let api_router = Router::new()
        .route(
            "/analyze-image",
            post(analyze_image_handler).options(preflight_handler),
        )
        .route(
            "/generate-image",
            post(generate_image_handler).options(preflight_handler),
        )
        .route("/models", get(list_models_handler))
        .route("/options", get(list_options_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(app_state.config.max_body_bytes))
        .layer(cors)
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
