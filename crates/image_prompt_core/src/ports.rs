//! crates/image_prompt_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! The relays talk to the remote models only through `VisionModelService` and
//! `ImageModelService`; the workflow talks to the relays only through
//! `RelayService`. Concrete HTTP implementations live in the `api` service.

use crate::domain::{AnalysisResult, RenderedImage};
use crate::image::DataUrl;
use async_trait::async_trait;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// Arabic message shown when the gateway rate-limits a call.
pub const RATE_LIMIT_MESSAGE: &str = "تم تجاوز الحد المسموح، حاول لاحقاً";
/// Arabic message shown when the gateway account is out of credit.
pub const QUOTA_MESSAGE: &str = "يرجى إضافة رصيد للاستمرار";

/// A generic error type for all port operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// The caller sent something unusable; no remote call was made.
    #[error("{0}")]
    InvalidInput(String),
    /// The gateway answered 429.
    #[error("{}", RATE_LIMIT_MESSAGE)]
    RateLimited,
    /// The gateway answered 402.
    #[error("{}", QUOTA_MESSAGE)]
    QuotaExceeded,
    /// The gateway answered with any other non-success status.
    #[error("AI Gateway error: {status}")]
    Upstream { status: u16 },
    #[error("No content in AI response")]
    EmptyReply,
    #[error("No image generated")]
    NoImageGenerated,
    #[error("{0} is not configured")]
    NotConfigured(String),
    /// A relay reached over HTTP failed; carries its `error` text as-is.
    #[error("{0}")]
    Remote(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Model Requests
//=========================================================================================

/// A single chat turn asking a vision model to describe one image.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub model: String,
    pub system_prompt: String,
    pub image: DataUrl,
    pub instruction: String,
}

/// A single chat turn asking an image model for an image back.
///
/// The gateway receives the instruction first, then the image (if any).
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub model: String,
    pub instruction: String,
    pub image: Option<String>,
}

//=========================================================================================
// Relay Requests
//=========================================================================================

/// What the client asks the analysis relay for.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeRequest {
    pub image: Option<String>,
    pub options: Vec<String>,
    pub model: Option<String>,
}

/// The two things the generation relay can do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageJob {
    Generate {
        prompt: String,
        reference_image: Option<String>,
    },
    Edit {
        image: String,
        instruction: Option<String>,
    },
}

impl ImageJob {
    /// The wire value of the `action` discriminator.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Generate { .. } => "generate",
            Self::Edit { .. } => "edit",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageJobRequest {
    pub job: ImageJob,
    pub model: Option<String>,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait VisionModelService: Send + Sync {
    /// Sends the image with its instructions and returns the model's raw reply text.
    async fn describe_image(&self, request: &VisionRequest) -> PortResult<String>;
}

#[async_trait]
pub trait ImageModelService: Send + Sync {
    /// Asks for an image (and optional text) and returns the first image attachment.
    async fn render_image(&self, request: &ImageRequest) -> PortResult<RenderedImage>;
}

/// The client's view of the two relay endpoints.
#[async_trait]
pub trait RelayService: Send + Sync {
    async fn analyze(&self, request: &AnalyzeRequest) -> PortResult<AnalysisResult>;

    async fn render(&self, request: &ImageJobRequest) -> PortResult<RenderedImage>;
}
