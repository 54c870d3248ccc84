//! services/api/src/bin/api.rs

use api_lib::{
    adapters::GatewayAdapter,
    config::Config,
    error::ApiError,
    web::{router, state::AppState},
};
use image_prompt_core::{ImageAnalyzer, ImageGenerator};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    if config.gateway_api_key.is_none() {
        warn!("AI_GATEWAY_API_KEY is not set; every relay call will fail until it is");
    }

    // --- 2. Initialize the Gateway Adapter ---
    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;
    let gateway = Arc::new(GatewayAdapter::new(
        http,
        &config.gateway_url,
        config.gateway_api_key.clone(),
    ));

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        analyzer: ImageAnalyzer::new(
            gateway.clone(),
            config.prompt_schema,
            config.analysis_model.clone(),
        ),
        generator: ImageGenerator::new(gateway, config.image_model.clone()),
    });

    // --- 4. Create the Web Router ---
    let app = router(app_state);

    // --- 5. Start the Server ---
    info!(
        schema = %config.prompt_schema,
        "Starting server on {}", config.bind_address
    );
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
