//! crates/image_prompt_core/src/workflow.rs
//!
//! The client-side workflow: one explicitly owned `Session` holding the three
//! image slots and the prompt, and a `WorkflowController` that sequences calls
//! to the relays.
//!
//! Every slot allows one request in flight. The session lock is only held
//! while a request is started or finished, never across the remote call, so
//! the slots stay independent of each other. Each slot carries an epoch that
//! moves whenever its value is replaced or cleared; a response whose source
//! moved on while it was in flight is dropped instead of overwriting newer
//! state.

use crate::catalog;
use crate::domain::{AnalysisResult, Language, PromptOption, RenderedImage};
use crate::ports::{AnalyzeRequest, ImageJob, ImageJobRequest, PortError, RelayService};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Sent when the user leaves the edit instruction blank.
pub const DEFAULT_CLIENT_EDIT_INSTRUCTION: &str =
    "Improve and enhance this image, make it more detailed and professional.";

//=========================================================================================
// Errors
//=========================================================================================

/// Errors surfaced to the user. The messages are the user-facing (Arabic) texts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("الرجاء رفع صورة أولاً")]
    MissingImage,
    #[error("الرجاء تفعيل خيار واحد على الأقل")]
    NoOptionsEnabled,
    #[error("الرجاء إنشاء البرومت أولاً")]
    PromptNotReady,
    #[error("الرجاء إنشاء الصورة أولاً")]
    GeneratedImageMissing,
    #[error("يوجد طلب قيد التنفيذ ({0})")]
    Busy(SlotKind),
    /// The response arrived after the state it was based on was replaced.
    #[error("تم تجاهل نتيجة قديمة ({0})")]
    Superseded(SlotKind),
    #[error(transparent)]
    Relay(#[from] PortError),
}

//=========================================================================================
// Slots
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Analysis,
    Generation,
    Edit,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analysis => f.write_str("analysis"),
            Self::Generation => f.write_str("generation"),
            Self::Edit => f.write_str("edit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotStatus {
    Idle,
    Requesting,
    Ready,
    Failed(String),
}

/// One piece of session state plus its request bookkeeping.
///
/// A failed request records its message but keeps the previous value.
#[derive(Debug, Clone)]
pub struct Slot<T> {
    value: Option<T>,
    in_flight: bool,
    last_error: Option<String>,
    epoch: u64,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            value: None,
            in_flight: false,
            last_error: None,
            epoch: 0,
        }
    }
}

impl<T> Slot<T> {
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn status(&self) -> SlotStatus {
        if self.in_flight {
            SlotStatus::Requesting
        } else if let Some(message) = &self.last_error {
            SlotStatus::Failed(message.clone())
        } else if self.value.is_some() {
            SlotStatus::Ready
        } else {
            SlotStatus::Idle
        }
    }

    fn begin(&mut self, kind: SlotKind) -> Result<(), WorkflowError> {
        if self.in_flight {
            return Err(WorkflowError::Busy(kind));
        }
        self.in_flight = true;
        self.last_error = None;
        Ok(())
    }

    fn set(&mut self, value: T) {
        self.value = Some(value);
        self.last_error = None;
        self.epoch += 1;
    }

    fn clear(&mut self) {
        self.value = None;
        self.last_error = None;
        self.epoch += 1;
    }
}

//=========================================================================================
// Session
//=========================================================================================

/// Everything one user session knows. Nothing here is persisted.
#[derive(Debug, Clone)]
pub struct Session {
    pub options: Vec<PromptOption>,
    pub analysis_model: String,
    pub image_model: String,
    pub edit_instruction: String,
    original: Slot<String>,
    prompt: Slot<AnalysisResult>,
    generated: Slot<RenderedImage>,
    edited: Slot<RenderedImage>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// What a started request needs to finish: the outgoing payload and the
/// epochs of the state it was built from.
#[derive(Debug)]
pub struct Ticket<R> {
    pub request: R,
    sources: Vec<(SourceSlot, u64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceSlot {
    Original,
    Prompt,
    Generated,
}

impl Session {
    pub fn new() -> Self {
        Self {
            options: catalog::default_options(),
            analysis_model: catalog::DEFAULT_CLIENT_ANALYSIS_MODEL.to_string(),
            image_model: catalog::DEFAULT_IMAGE_MODEL.to_string(),
            edit_instruction: String::new(),
            original: Slot::default(),
            prompt: Slot::default(),
            generated: Slot::default(),
            edited: Slot::default(),
        }
    }

    pub fn original(&self) -> &Slot<String> {
        &self.original
    }

    pub fn prompt(&self) -> &Slot<AnalysisResult> {
        &self.prompt
    }

    pub fn generated(&self) -> &Slot<RenderedImage> {
        &self.generated
    }

    pub fn edited(&self) -> &Slot<RenderedImage> {
        &self.edited
    }

    /// Replaces the original image; any generated or edited image is now stale.
    pub fn upload(&mut self, image: String) {
        self.original.set(image);
        self.generated.clear();
        self.edited.clear();
    }

    /// Flips one option. Returns `false` for an unknown id.
    pub fn toggle_option(&mut self, id: &str) -> bool {
        match self.options.iter_mut().find(|o| o.id == id) {
            Some(option) => {
                option.enabled = !option.enabled;
                true
            }
            None => false,
        }
    }

    /// English labels of the enabled options, in catalog order.
    pub fn enabled_labels(&self) -> Vec<String> {
        self.options
            .iter()
            .filter(|o| o.enabled)
            .map(|o| o.label_en.clone())
            .collect()
    }

    fn epoch_of(&self, source: SourceSlot) -> u64 {
        match source {
            SourceSlot::Original => self.original.epoch,
            SourceSlot::Prompt => self.prompt.epoch,
            SourceSlot::Generated => self.generated.epoch,
        }
    }

    fn ticket<R>(&self, request: R, sources: &[SourceSlot]) -> Ticket<R> {
        Ticket {
            request,
            sources: sources.iter().map(|s| (*s, self.epoch_of(*s))).collect(),
        }
    }

    fn is_current<R>(&self, ticket: &Ticket<R>) -> bool {
        ticket
            .sources
            .iter()
            .all(|(source, epoch)| self.epoch_of(*source) == *epoch)
    }

    //--- Analysis ------------------------------------------------------------------------

    pub fn begin_analysis(&mut self) -> Result<Ticket<AnalyzeRequest>, WorkflowError> {
        let image = self.original.value.clone().ok_or(WorkflowError::MissingImage)?;
        let options = self.enabled_labels();
        if options.is_empty() {
            return Err(WorkflowError::NoOptionsEnabled);
        }
        self.prompt.begin(SlotKind::Analysis)?;
        self.generated.clear();
        self.edited.clear();

        let request = AnalyzeRequest {
            image: Some(image),
            options,
            model: Some(self.analysis_model.clone()),
        };
        Ok(self.ticket(request, &[SourceSlot::Original]))
    }

    pub fn finish_analysis(
        &mut self,
        ticket: Ticket<AnalyzeRequest>,
        outcome: Result<AnalysisResult, PortError>,
    ) -> Result<AnalysisResult, WorkflowError> {
        self.prompt.in_flight = false;
        if !self.is_current(&ticket) {
            warn!("Discarding analysis result for a replaced image");
            return Err(WorkflowError::Superseded(SlotKind::Analysis));
        }
        match outcome {
            Ok(result) => {
                self.prompt.set(result.clone());
                Ok(result)
            }
            Err(e) => {
                self.prompt.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    //--- Generation ----------------------------------------------------------------------

    pub fn begin_generation(&mut self) -> Result<Ticket<ImageJobRequest>, WorkflowError> {
        if self.prompt.in_flight {
            return Err(WorkflowError::PromptNotReady);
        }
        let prompt = self.prompt.value.as_ref().ok_or(WorkflowError::PromptNotReady)?;
        let reference_image = self.original.value.clone().ok_or(WorkflowError::MissingImage)?;
        let full_prompt = prompt.full_text(Language::English);
        self.generated.begin(SlotKind::Generation)?;

        let request = ImageJobRequest {
            job: ImageJob::Generate {
                prompt: full_prompt,
                reference_image: Some(reference_image),
            },
            model: Some(self.image_model.clone()),
        };
        Ok(self.ticket(
            request,
            &[SourceSlot::Original, SourceSlot::Prompt, SourceSlot::Generated],
        ))
    }

    pub fn finish_generation(
        &mut self,
        ticket: Ticket<ImageJobRequest>,
        outcome: Result<RenderedImage, PortError>,
    ) -> Result<RenderedImage, WorkflowError> {
        self.generated.in_flight = false;
        if !self.is_current(&ticket) {
            warn!("Discarding generated image for a replaced prompt");
            return Err(WorkflowError::Superseded(SlotKind::Generation));
        }
        match outcome {
            Ok(image) => {
                self.generated.set(image.clone());
                Ok(image)
            }
            Err(e) => {
                self.generated.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    //--- Edit ----------------------------------------------------------------------------

    pub fn begin_edit(&mut self) -> Result<Ticket<ImageJobRequest>, WorkflowError> {
        let source = self
            .generated
            .value
            .as_ref()
            .map(|g| g.image.clone())
            .ok_or(WorkflowError::GeneratedImageMissing)?;
        self.edited.begin(SlotKind::Edit)?;

        let instruction = match self.edit_instruction.trim() {
            "" => DEFAULT_CLIENT_EDIT_INSTRUCTION.to_string(),
            _ => self.edit_instruction.clone(),
        };
        let request = ImageJobRequest {
            job: ImageJob::Edit {
                image: source,
                instruction: Some(instruction),
            },
            model: Some(self.image_model.clone()),
        };
        Ok(self.ticket(request, &[SourceSlot::Generated]))
    }

    pub fn finish_edit(
        &mut self,
        ticket: Ticket<ImageJobRequest>,
        outcome: Result<RenderedImage, PortError>,
    ) -> Result<RenderedImage, WorkflowError> {
        self.edited.in_flight = false;
        if !self.is_current(&ticket) {
            warn!("Discarding edited image for a replaced generated image");
            return Err(WorkflowError::Superseded(SlotKind::Edit));
        }
        match outcome {
            Ok(image) => {
                self.edited.set(image.clone());
                Ok(image)
            }
            Err(e) => {
                self.edited.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }
}

//=========================================================================================
// WorkflowController
//=========================================================================================

/// Drives a `Session` against a `RelayService`.
pub struct WorkflowController {
    relay: Arc<dyn RelayService>,
    session: Mutex<Session>,
}

impl WorkflowController {
    pub fn new(relay: Arc<dyn RelayService>) -> Self {
        Self::with_session(relay, Session::new())
    }

    pub fn with_session(relay: Arc<dyn RelayService>, session: Session) -> Self {
        Self {
            relay,
            session: Mutex::new(session),
        }
    }

    /// A copy of the current session for display.
    pub async fn snapshot(&self) -> Session {
        self.session.lock().await.clone()
    }

    pub async fn upload(&self, image: String) {
        self.session.lock().await.upload(image);
    }

    pub async fn toggle_option(&self, id: &str) -> bool {
        self.session.lock().await.toggle_option(id)
    }

    pub async fn set_analysis_model(&self, model: String) {
        self.session.lock().await.analysis_model = model;
    }

    pub async fn set_image_model(&self, model: String) {
        self.session.lock().await.image_model = model;
    }

    pub async fn set_edit_instruction(&self, instruction: String) {
        self.session.lock().await.edit_instruction = instruction;
    }

    pub async fn analyze(&self) -> Result<AnalysisResult, WorkflowError> {
        let ticket = self.session.lock().await.begin_analysis()?;
        info!(aspects = ticket.request.options.len(), "Analysis requested");
        let outcome = self.relay.analyze(&ticket.request).await;
        self.session.lock().await.finish_analysis(ticket, outcome)
    }

    pub async fn generate_image(&self) -> Result<RenderedImage, WorkflowError> {
        let ticket = self.session.lock().await.begin_generation()?;
        info!("Image generation requested");
        let outcome = self.relay.render(&ticket.request).await;
        self.session.lock().await.finish_generation(ticket, outcome)
    }

    pub async fn edit_image(&self) -> Result<RenderedImage, WorkflowError> {
        let ticket = self.session.lock().await.begin_edit()?;
        info!("Image edit requested");
        let outcome = self.relay.render(&ticket.request).await;
        self.session.lock().await.finish_edit(ticket, outcome)
    }
}
