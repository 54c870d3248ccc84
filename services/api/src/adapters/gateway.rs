//! services/api/src/adapters/gateway.rs
//!
//! This module contains the adapter for the OpenAI-compatible AI gateway.
//! It implements both the `VisionModelService` and `ImageModelService` ports
//! from the `core` crate over a single `chat/completions` endpoint.
//!
//! Calls are made exactly once. 429 and 402 are mapped to their own port
//! errors so callers can show the matching message; nothing is retried.

use async_trait::async_trait;
use image_prompt_core::domain::RenderedImage;
use image_prompt_core::ports::{
    ImageModelService, ImageRequest, PortError, PortResult, VisionModelService, VisionRequest,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

const ERROR_BODY_LOG_LIMIT: usize = 2000;

//=========================================================================================
// Gateway Wire Types
//=========================================================================================

#[derive(Serialize, Debug)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modalities: Option<Vec<&'static str>>,
}

#[derive(Serialize, Debug)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: UrlRef },
}

#[derive(Serialize, Deserialize, Debug)]
struct UrlRef {
    url: String,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    #[serde(default)]
    message: AssistantMessage,
}

#[derive(Deserialize, Debug, Default)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    images: Vec<ImageAttachment>,
}

#[derive(Deserialize, Debug)]
struct ImageAttachment {
    image_url: Option<UrlRef>,
}

impl ChatResponse {
    fn into_first_message(self) -> AssistantMessage {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .unwrap_or_default()
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that talks to an OpenAI-compatible chat completions gateway.
#[derive(Clone)]
pub struct GatewayAdapter {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GatewayAdapter {
    /// Creates a new `GatewayAdapter` for the given base URL (e.g. `https://host/v1`).
    pub fn new(http: Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
        }
    }

    async fn complete(&self, request: &ChatRequest) -> PortResult<ChatResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PortError::NotConfigured("AI gateway API key".to_string()))?;

        debug!(model = %request.model, endpoint = %self.endpoint, "Calling AI gateway");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("AI gateway request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error_status(status, &body));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Malformed AI gateway response: {}", e)))
    }
}

/// Maps a non-success gateway status to the port error taxonomy, logging the body.
fn map_error_status(status: StatusCode, body: &str) -> PortError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            warn!("AI gateway rate limit hit");
            PortError::RateLimited
        }
        StatusCode::PAYMENT_REQUIRED => {
            warn!("AI gateway reports insufficient credit");
            PortError::QuotaExceeded
        }
        _ => {
            let body: String = body.chars().take(ERROR_BODY_LOG_LIMIT).collect();
            error!(status = status.as_u16(), body = %body, "AI gateway error");
            PortError::Upstream {
                status: status.as_u16(),
            }
        }
    }
}

//=========================================================================================
// Port Implementations
//=========================================================================================

#[async_trait]
impl VisionModelService for GatewayAdapter {
    /// Sends `[system, user[image, text]]` and returns the reply text (possibly empty).
    async fn describe_image(&self, request: &VisionRequest) -> PortResult<String> {
        let chat = ChatRequest {
            model: request.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(request.system_prompt.clone()),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::ImageUrl {
                            image_url: UrlRef {
                                url: request.image.to_string(),
                            },
                        },
                        ContentPart::Text {
                            text: request.instruction.clone(),
                        },
                    ]),
                },
            ],
            modalities: None,
        };

        let message = self.complete(&chat).await?.into_first_message();
        Ok(message.content.unwrap_or_default())
    }
}

#[async_trait]
impl ImageModelService for GatewayAdapter {
    /// Sends `user[text, image?]` asking for image and text output.
    async fn render_image(&self, request: &ImageRequest) -> PortResult<RenderedImage> {
        let mut parts = vec![ContentPart::Text {
            text: request.instruction.clone(),
        }];
        if let Some(image) = &request.image {
            parts.push(ContentPart::ImageUrl {
                image_url: UrlRef { url: image.clone() },
            });
        }
        let chat = ChatRequest {
            model: request.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: MessageContent::Parts(parts),
            }],
            modalities: Some(vec!["image", "text"]),
        };

        let message = self.complete(&chat).await?.into_first_message();
        let image = message
            .images
            .into_iter()
            .find_map(|attachment| attachment.image_url)
            .map(|url| url.url)
            .filter(|url| !url.is_empty())
            .ok_or(PortError::NoImageGenerated)?;

        Ok(RenderedImage {
            image,
            text: message.content.unwrap_or_default(),
        })
    }
}
