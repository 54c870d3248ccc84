//! crates/image_prompt_core/src/generation.rs
//!
//! The image generation/edit relay. One entry point, two jobs: render a new
//! image from a prompt (optionally guided by a reference image), or edit an
//! existing image following an instruction.

use crate::domain::RenderedImage;
use crate::ports::{
    ImageJob, ImageJobRequest, ImageModelService, ImageRequest, PortError, PortResult,
};
use std::sync::Arc;
use tracing::info;

/// Used when an edit request carries no instruction.
pub const DEFAULT_EDIT_INSTRUCTION: &str =
    "Improve and enhance this image while keeping the same composition and style.";

const GENERATE_TEMPLATE: &str = "Based on the following detailed prompt, generate a new image that captures all the described elements. Use the reference image as visual guidance for style and composition.\n\nPrompt:\n{prompt}";

/// Relays generate and edit jobs to an image-capable model.
#[derive(Clone)]
pub struct ImageGenerator {
    images: Arc<dyn ImageModelService>,
    default_model: String,
}

impl ImageGenerator {
    pub fn new(images: Arc<dyn ImageModelService>, default_model: String) -> Self {
        Self {
            images,
            default_model,
        }
    }

    pub async fn render(&self, request: &ImageJobRequest) -> PortResult<RenderedImage> {
        let model = request
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.default_model)
            .to_string();

        let image_request = match &request.job {
            ImageJob::Generate {
                prompt,
                reference_image,
            } => ImageRequest {
                model,
                instruction: GENERATE_TEMPLATE.replace("{prompt}", prompt),
                image: non_blank(reference_image.as_deref()),
            },
            ImageJob::Edit { image, instruction } => {
                let image = non_blank(Some(image))
                    .ok_or_else(|| PortError::InvalidInput("No image to edit".to_string()))?;
                ImageRequest {
                    model,
                    instruction: non_blank(instruction.as_deref())
                        .unwrap_or_else(|| DEFAULT_EDIT_INSTRUCTION.to_string()),
                    image: Some(image),
                }
            }
        };

        info!(
            action = request.job.action(),
            model = %image_request.model,
            with_image = image_request.image.is_some(),
            "Requesting image from model"
        );
        self.images.render_image(&image_request).await
    }
}

/// Builds a job from the loose fields of a relay request, dispatching on `action`.
pub fn job_from_action(
    action: Option<&str>,
    prompt: Option<String>,
    reference_image: Option<String>,
    edit_image: Option<String>,
    edit_instruction: Option<String>,
) -> PortResult<ImageJob> {
    match action {
        Some("generate") => Ok(ImageJob::Generate {
            prompt: prompt.unwrap_or_default(),
            reference_image,
        }),
        Some("edit") => Ok(ImageJob::Edit {
            image: edit_image.unwrap_or_default(),
            instruction: edit_instruction,
        }),
        _ => Err(PortError::InvalidInput("Invalid action".to_string())),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}
