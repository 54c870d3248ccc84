pub mod analysis;
pub mod catalog;
pub mod domain;
pub mod generation;
pub mod image;
pub mod normalize;
pub mod ports;
pub mod relay;
pub mod workflow;

pub use analysis::ImageAnalyzer;
pub use domain::{
    AnalysisResult, FlatPrompt, Language, ModelInfo, PromptOption, PromptSchema, PromptSection,
    RenderedImage, StructuredPrompt,
};
pub use generation::ImageGenerator;
pub use image::DataUrl;
pub use normalize::TextToStructuredData;
pub use ports::{
    AnalyzeRequest, ImageJob, ImageJobRequest, ImageModelService, PortError, PortResult,
    RelayService, VisionModelService,
};
pub use relay::LocalRelay;
pub use workflow::{Session, SlotStatus, WorkflowController, WorkflowError};
