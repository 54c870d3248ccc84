//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use image_prompt_core::{ImageAnalyzer, ImageGenerator};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
///
/// The relays are stateless; nothing here changes after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub analyzer: ImageAnalyzer,
    pub generator: ImageGenerator,
}
