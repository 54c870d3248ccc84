//! crates/image_prompt_core/src/relay.rs
//!
//! An in-process `RelayService` that runs both relays directly against the
//! model ports, with no HTTP hop in between.

use crate::analysis::ImageAnalyzer;
use crate::domain::{AnalysisResult, RenderedImage};
use crate::generation::ImageGenerator;
use crate::ports::{AnalyzeRequest, ImageJobRequest, PortResult, RelayService};
use async_trait::async_trait;

#[derive(Clone)]
pub struct LocalRelay {
    analyzer: ImageAnalyzer,
    generator: ImageGenerator,
}

impl LocalRelay {
    pub fn new(analyzer: ImageAnalyzer, generator: ImageGenerator) -> Self {
        Self {
            analyzer,
            generator,
        }
    }
}

#[async_trait]
impl RelayService for LocalRelay {
    async fn analyze(&self, request: &AnalyzeRequest) -> PortResult<AnalysisResult> {
        self.analyzer.analyze(request).await
    }

    async fn render(&self, request: &ImageJobRequest) -> PortResult<RenderedImage> {
        self.generator.render(request).await
    }
}
