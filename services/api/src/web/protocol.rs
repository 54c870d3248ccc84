//! services/api/src/web/protocol.rs
//!
//! Defines the JSON bodies exchanged between the browser (or CLI) client and
//! the relay endpoints. Field names are camelCase on the wire.

use image_prompt_core::generation::job_from_action;
use image_prompt_core::ports::{AnalyzeRequest, ImageJob, ImageJobRequest, PortError};
use image_prompt_core::{ModelInfo, RenderedImage};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

//=========================================================================================
// Request Bodies
//=========================================================================================

/// Body of `POST /analyze-image`.
#[derive(Serialize, Deserialize, ToSchema, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeImageBody {
    /// The image as `data:image/<subtype>;base64,<payload>`.
    #[serde(default)]
    pub image: Option<String>,
    /// English labels of the aspects to describe.
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl From<AnalyzeImageBody> for AnalyzeRequest {
    fn from(body: AnalyzeImageBody) -> Self {
        Self {
            image: body.image,
            options: body.options,
            model: body.model,
        }
    }
}

impl From<&AnalyzeRequest> for AnalyzeImageBody {
    fn from(request: &AnalyzeRequest) -> Self {
        Self {
            image: request.image.clone(),
            options: request.options.clone(),
            model: request.model.clone(),
        }
    }
}

/// Body of `POST /generate-image`. `action` selects `generate` or `edit`.
#[derive(Serialize, Deserialize, ToSchema, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_instruction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl TryFrom<GenerateImageBody> for ImageJobRequest {
    type Error = PortError;

    fn try_from(body: GenerateImageBody) -> Result<Self, Self::Error> {
        let job = job_from_action(
            body.action.as_deref(),
            body.prompt,
            body.reference_image,
            body.edit_image,
            body.edit_instruction,
        )?;
        Ok(Self {
            job,
            model: body.model,
        })
    }
}

impl From<&ImageJobRequest> for GenerateImageBody {
    fn from(request: &ImageJobRequest) -> Self {
        let mut body = Self {
            action: Some(request.job.action().to_string()),
            model: request.model.clone(),
            ..Self::default()
        };
        match &request.job {
            ImageJob::Generate {
                prompt,
                reference_image,
            } => {
                body.prompt = Some(prompt.clone());
                body.reference_image = reference_image.clone();
            }
            ImageJob::Edit { image, instruction } => {
                body.edit_image = Some(image.clone());
                body.edit_instruction = instruction.clone();
            }
        }
        body
    }
}

//=========================================================================================
// Response Bodies
//=========================================================================================

/// Body of a successful `POST /generate-image`.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct ImageResponse {
    /// Data URL or remote URL of the first image the model returned.
    pub image: String,
    /// Text the model sent with the image; may be empty.
    pub text: String,
}

impl From<RenderedImage> for ImageResponse {
    fn from(rendered: RenderedImage) -> Self {
        Self {
            image: rendered.image,
            text: rendered.text,
        }
    }
}

impl From<ImageResponse> for RenderedImage {
    fn from(response: ImageResponse) -> Self {
        Self {
            image: response.image,
            text: response.text,
        }
    }
}

/// Body of every failed relay call.
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct ModelEntry {
    pub id: String,
    pub label: String,
    pub description: String,
}

impl From<&ModelInfo> for ModelEntry {
    fn from(model: &ModelInfo) -> Self {
        Self {
            id: model.id.to_string(),
            label: model.label.to_string(),
            description: model.description.to_string(),
        }
    }
}

/// Body of `GET /models`.
///
/// `default*` are the models a new client session starts with; `relay*` are
/// what this relay falls back to when a request names no model.
#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ModelCatalogResponse {
    pub analysis_models: Vec<ModelEntry>,
    pub image_models: Vec<ModelEntry>,
    pub default_analysis_model: String,
    pub default_image_model: String,
    pub relay_analysis_model: String,
    pub relay_image_model: String,
}
