//! services/api/src/adapters/relay_client.rs
//!
//! A `RelayService` that calls a deployed relay over HTTP. This is what the
//! workflow uses when the relays run in a separate process.

use crate::web::protocol::{AnalyzeImageBody, ErrorBody, GenerateImageBody, ImageResponse};
use async_trait::async_trait;
use image_prompt_core::ports::{
    AnalyzeRequest, ImageJobRequest, PortError, PortResult, RelayService,
};
use image_prompt_core::{AnalysisResult, PromptSchema, RenderedImage};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

#[derive(Clone)]
pub struct HttpRelayClient {
    http: Client,
    base_url: String,
    schema: PromptSchema,
}

impl HttpRelayClient {
    /// `schema` is the analysis shape this client expects; a relay answering
    /// with the other shape is treated as a failure.
    pub fn new(http: Client, base_url: &str, schema: PromptSchema) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            schema,
        }
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> PortResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "Calling relay");
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Relay request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Malformed relay response: {}", e)))
    }
}

/// Turns a relay error response back into the port error it came from.
async fn error_from_response(response: Response) -> PortError {
    let status = response.status();
    let message = response
        .json::<ErrorBody>()
        .await
        .map(|body| body.error)
        .unwrap_or_else(|_| format!("Relay error: {}", status.as_u16()));
    match status {
        StatusCode::BAD_REQUEST => PortError::InvalidInput(message),
        StatusCode::TOO_MANY_REQUESTS => PortError::RateLimited,
        StatusCode::PAYMENT_REQUIRED => PortError::QuotaExceeded,
        _ => PortError::Remote(message),
    }
}

#[async_trait]
impl RelayService for HttpRelayClient {
    async fn analyze(&self, request: &AnalyzeRequest) -> PortResult<AnalysisResult> {
        let result: AnalysisResult = self
            .post("/analyze-image", &AnalyzeImageBody::from(request))
            .await?;
        if result.schema() != self.schema {
            return Err(PortError::Unexpected(format!(
                "Relay answered with the {} schema, expected {}",
                result.schema(),
                self.schema
            )));
        }
        Ok(result)
    }

    async fn render(&self, request: &ImageJobRequest) -> PortResult<RenderedImage> {
        let response: ImageResponse = self
            .post("/generate-image", &GenerateImageBody::from(request))
            .await?;
        Ok(response.into())
    }
}
