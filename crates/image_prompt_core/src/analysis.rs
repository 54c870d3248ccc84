//! crates/image_prompt_core/src/analysis.rs
//!
//! The image analysis relay: validates the request, instructs the vision model
//! to describe the image in both languages, and normalizes whatever comes back
//! into the deployment's prompt schema.

use crate::domain::{AnalysisResult, FlatPrompt, PromptSchema, PromptSection, StructuredPrompt};
use crate::image::DataUrl;
use crate::normalize::{NormalizationTier, TextToStructuredData};
use crate::ports::{AnalyzeRequest, PortError, PortResult, VisionModelService, VisionRequest};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

const FLAT_SYSTEM_TEMPLATE: &str = r#"You are an expert prompt engineer for AI image generation. Study the provided image and write a detailed, professional prompt that could recreate or modify a similar image with models such as Midjourney, DALL-E or Stable Diffusion.

Focus on these aspects: {aspects}

Respond with ONE JSON object and nothing else (no markdown, no code fences), exactly in this shape:
{"promptAr": "<the prompt in Arabic>", "promptEn": "<the prompt in English>"}

Both prompts must be complete, specific and ready to use. Use technical photography terms where they help."#;

const STRUCTURED_SYSTEM_TEMPLATE: &str = r#"You are an expert prompt engineer for AI image generation. Study the provided image and describe it as a structured, professional prompt that could recreate or modify a similar image.

Describe exactly these aspects, one section each: {aspects}

Respond with ONE JSON object and nothing else (no markdown, no code fences), exactly in this shape:
{"titleAr": "<short title in Arabic>", "titleEn": "<short title in English>", "overviewAr": "<overall description in Arabic>", "overviewEn": "<overall description in English>", "sections": {sections}}

Rules:
- The keys of "sections" must be exactly the aspect names listed above, written in English as given.
- Every field needs both an Arabic ("ar") and an English ("en") text; never leave one empty.
- Be specific and visual. Use technical photography and art terms where they help."#;

const USER_INSTRUCTION: &str =
    "Analyze this image and write the prompt in both Arabic and English for the requested aspects.";

//=========================================================================================
// The Analysis Relay
//=========================================================================================

/// Relays analysis requests to a vision model.
#[derive(Clone)]
pub struct ImageAnalyzer {
    vision: Arc<dyn VisionModelService>,
    schema: PromptSchema,
    default_model: String,
}

impl ImageAnalyzer {
    pub fn new(vision: Arc<dyn VisionModelService>, schema: PromptSchema, default_model: String) -> Self {
        Self {
            vision,
            schema,
            default_model,
        }
    }

    pub fn schema(&self) -> PromptSchema {
        self.schema
    }

    /// Runs one analysis. Input errors are raised before the model is called.
    pub async fn analyze(&self, request: &AnalyzeRequest) -> PortResult<AnalysisResult> {
        let raw_image = request
            .image
            .as_deref()
            .filter(|image| !image.trim().is_empty())
            .ok_or_else(|| PortError::InvalidInput("No image provided".to_string()))?;
        let image = DataUrl::parse(raw_image)?;

        let model = request
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.default_model)
            .to_string();

        let vision_request = VisionRequest {
            model,
            system_prompt: system_prompt(self.schema, &request.options),
            image,
            instruction: USER_INSTRUCTION.to_string(),
        };

        info!(
            model = %vision_request.model,
            schema = %self.schema,
            aspects = request.options.len(),
            mime = %vision_request.image.mime_type(),
            "Requesting image analysis"
        );
        let reply = self.vision.describe_image(&vision_request).await?;

        match self.schema {
            PromptSchema::Structured => {
                let normalized = StructuredPrompt::from_model_reply(&reply)?;
                let prompt = match normalized.tier {
                    NormalizationTier::Degraded => normalized.value,
                    _ => reconcile_sections(normalized.value, &request.options),
                };
                Ok(AnalysisResult::Structured(prompt))
            }
            PromptSchema::Flat => {
                let normalized = FlatPrompt::from_model_reply(&reply)?;
                Ok(AnalysisResult::Flat(normalized.value))
            }
        }
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Builds the schema-specific system instruction for the given aspects.
pub fn system_prompt(schema: PromptSchema, aspects: &[String]) -> String {
    let listed = aspects.join(", ");
    match schema {
        PromptSchema::Flat => FLAT_SYSTEM_TEMPLATE.replace("{aspects}", &listed),
        PromptSchema::Structured => {
            let skeleton = aspects
                .iter()
                .map(|label| {
                    format!(
                        "{}: {{\"ar\": \"...\", \"en\": \"...\"}}",
                        serde_json::Value::String(label.clone())
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");
            STRUCTURED_SYSTEM_TEMPLATE
                .replace("{aspects}", &listed)
                .replace("{sections}", &format!("{{{}}}", skeleton))
        }
    }
}

/// Makes the section keys match the requested labels.
///
/// Requested sections keep the model's order; unrequested ones are dropped and
/// missing ones are appended empty.
fn reconcile_sections(mut prompt: StructuredPrompt, requested: &[String]) -> StructuredPrompt {
    let mut sections: IndexMap<String, PromptSection> = IndexMap::with_capacity(requested.len());
    for (key, section) in prompt.sections.drain(..) {
        let wanted = key.trim().to_lowercase();
        let canonical = requested
            .iter()
            .find(|label| label.trim().to_lowercase() == wanted && !sections.contains_key(*label));
        match canonical {
            Some(label) => {
                if *label != key {
                    debug!(section = %key, label = %label, "Renaming section to the requested label");
                }
                sections.insert(label.clone(), section);
            }
            None => warn!(section = %key, "Dropping section that was not requested"),
        }
    }
    for label in requested {
        if !sections.contains_key(label) {
            warn!(section = %label, "Model omitted a requested section");
            sections.insert(label.clone(), PromptSection::default());
        }
    }
    prompt.sections = sections;
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const IMAGE: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRg==";

    /// Replies with a fixed text and records what it was asked.
    struct ScriptedVision {
        reply: PortResult<String>,
        calls: Mutex<Vec<VisionRequest>>,
    }

    impl ScriptedVision {
        fn replying(reply: PortResult<String>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl VisionModelService for ScriptedVision {
        async fn describe_image(&self, request: &VisionRequest) -> PortResult<String> {
            self.calls.lock().unwrap().push(request.clone());
            self.reply.clone()
        }
    }

    fn labels(ids: &[&str]) -> Vec<String> {
        catalog::default_options()
            .into_iter()
            .filter(|o| ids.contains(&o.id.as_str()))
            .map(|o| o.label_en)
            .collect()
    }

    /// A well-behaved model: one section per requested aspect.
    fn honest_reply(aspects: &[String]) -> String {
        let sections: serde_json::Map<String, serde_json::Value> = aspects
            .iter()
            .map(|a| (a.clone(), serde_json::json!({"ar": "نص", "en": format!("About {}", a)})))
            .collect();
        serde_json::json!({
            "titleAr": "عنوان",
            "titleEn": "Title",
            "overviewAr": "نظرة",
            "overviewEn": "Overview",
            "sections": sections,
        })
        .to_string()
    }

    fn analyzer(vision: Arc<ScriptedVision>, schema: PromptSchema) -> ImageAnalyzer {
        ImageAnalyzer::new(vision, schema, catalog::DEFAULT_RELAY_ANALYSIS_MODEL.to_string())
    }

    #[tokio::test]
    async fn section_keys_match_every_requested_subset() {
        let subsets: [&[&str]; 4] = [
            &["lighting"],
            &["mood", "composition"],
            &["camera_angle", "colors", "materials", "time"],
            &[
                "camera_angle", "camera_effects", "environment", "colors", "materials",
                "lighting", "time", "art_style", "mood", "composition",
            ],
        ];
        for subset in subsets {
            let aspects = labels(subset);
            let vision = ScriptedVision::replying(Ok(honest_reply(&aspects)));
            let request = AnalyzeRequest {
                image: Some(IMAGE.to_string()),
                options: aspects.clone(),
                model: None,
            };
            let result = analyzer(vision, PromptSchema::Structured).analyze(&request).await.unwrap();
            let AnalysisResult::Structured(prompt) = result else {
                panic!("expected structured result");
            };
            let mut keys: Vec<String> = prompt.sections.keys().cloned().collect();
            let mut expected = aspects.clone();
            keys.sort();
            expected.sort();
            assert_eq!(keys, expected);
        }
    }

    #[tokio::test]
    async fn missing_image_fails_without_calling_the_model() {
        for image in [None, Some(String::new()), Some("   ".to_string())] {
            let vision = ScriptedVision::replying(Ok("unused".to_string()));
            let request = AnalyzeRequest {
                image,
                options: labels(&["lighting"]),
                model: None,
            };
            let err = analyzer(vision.clone(), PromptSchema::Structured)
                .analyze(&request)
                .await
                .unwrap_err();
            assert_eq!(err, PortError::InvalidInput("No image provided".to_string()));
            assert_eq!(vision.call_count(), 0);
        }
    }

    #[tokio::test]
    async fn malformed_data_url_fails_without_calling_the_model() {
        let vision = ScriptedVision::replying(Ok("unused".to_string()));
        let request = AnalyzeRequest {
            image: Some("https://example.com/photo.jpg".to_string()),
            options: labels(&["lighting"]),
            model: None,
        };
        let err = analyzer(vision.clone(), PromptSchema::Flat).analyze(&request).await.unwrap_err();
        assert_eq!(err, PortError::InvalidInput("Invalid image format".to_string()));
        assert_eq!(vision.call_count(), 0);
    }

    #[tokio::test]
    async fn request_carries_model_aspects_and_image() {
        let aspects = labels(&["lighting", "mood"]);
        let vision = ScriptedVision::replying(Ok(honest_reply(&aspects)));
        let request = AnalyzeRequest {
            image: Some(IMAGE.to_string()),
            options: aspects,
            model: Some("acme/not-in-catalog".to_string()),
        };
        analyzer(vision.clone(), PromptSchema::Structured).analyze(&request).await.unwrap();

        let calls = vision.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, "acme/not-in-catalog");
        assert_eq!(calls[0].image.to_string(), IMAGE);
        assert!(calls[0].system_prompt.contains("Lighting, Mood & Emotion"));
        assert!(calls[0].system_prompt.contains(r#""Mood & Emotion": {"ar""#));
    }

    #[tokio::test]
    async fn blank_model_falls_back_to_the_relay_default() {
        let vision = ScriptedVision::replying(Ok(r#"{"promptAr":"أ","promptEn":"a"}"#.to_string()));
        let request = AnalyzeRequest {
            image: Some(IMAGE.to_string()),
            options: labels(&["colors"]),
            model: Some(" ".to_string()),
        };
        analyzer(vision.clone(), PromptSchema::Flat).analyze(&request).await.unwrap();
        assert_eq!(
            vision.calls.lock().unwrap()[0].model,
            catalog::DEFAULT_RELAY_ANALYSIS_MODEL
        );
    }

    #[tokio::test]
    async fn sections_are_reconciled_against_the_request() {
        let reply = r#"{"titleAr":"ع","titleEn":"T","overviewAr":"ن","overviewEn":"O","sections":{"Colors":{"ar":"أ","en":"c"},"Shadows":{"ar":"ظ","en":"s"}}}"#;
        let vision = ScriptedVision::replying(Ok(reply.to_string()));
        let request = AnalyzeRequest {
            image: Some(IMAGE.to_string()),
            options: labels(&["colors", "lighting"]),
            model: None,
        };
        let AnalysisResult::Structured(prompt) =
            analyzer(vision, PromptSchema::Structured).analyze(&request).await.unwrap()
        else {
            panic!("expected structured result");
        };
        let keys: Vec<&str> = prompt.sections.keys().map(String::as_str).collect();
        assert_eq!(keys, ["Colors", "Lighting"]);
        assert_eq!(prompt.sections["Lighting"], PromptSection::default());
    }

    #[tokio::test]
    async fn section_keys_differing_in_case_or_spacing_keep_their_text() {
        let reply = r#"{"titleAr":"ع","titleEn":"T","overviewAr":"ن","overviewEn":"O","sections":{"lighting":{"ar":"ذهبي","en":"Golden hour glow"}," Colors ":{"ar":"أ","en":"c"}}}"#;
        let vision = ScriptedVision::replying(Ok(reply.to_string()));
        let request = AnalyzeRequest {
            image: Some(IMAGE.to_string()),
            options: labels(&["colors", "lighting"]),
            model: None,
        };
        let AnalysisResult::Structured(prompt) =
            analyzer(vision, PromptSchema::Structured).analyze(&request).await.unwrap()
        else {
            panic!("expected structured result");
        };
        let keys: Vec<&str> = prompt.sections.keys().map(String::as_str).collect();
        assert_eq!(keys, ["Lighting", "Colors"]);
        assert_eq!(prompt.sections["Lighting"].en, "Golden hour glow");
        assert_eq!(prompt.sections["Lighting"].ar, "ذهبي");
        assert_eq!(prompt.sections["Colors"].en, "c");
    }

    #[tokio::test]
    async fn empty_option_list_yields_empty_sections() {
        let vision = ScriptedVision::replying(Ok(honest_reply(&[])));
        let request = AnalyzeRequest {
            image: Some(IMAGE.to_string()),
            options: Vec::new(),
            model: None,
        };
        let AnalysisResult::Structured(prompt) =
            analyzer(vision, PromptSchema::Structured).analyze(&request).await.unwrap()
        else {
            panic!("expected structured result");
        };
        assert!(prompt.sections.is_empty());
    }

    #[tokio::test]
    async fn plain_text_reply_degrades_in_flat_schema() {
        let vision = ScriptedVision::replying(Ok("A quiet harbor at dawn.".to_string()));
        let request = AnalyzeRequest {
            image: Some(IMAGE.to_string()),
            options: labels(&["time"]),
            model: None,
        };
        let result = analyzer(vision, PromptSchema::Flat).analyze(&request).await.unwrap();
        assert_eq!(
            result,
            AnalysisResult::Flat(FlatPrompt {
                prompt_ar: "A quiet harbor at dawn.".to_string(),
                prompt_en: "A quiet harbor at dawn.".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn upstream_errors_pass_through() {
        let vision = ScriptedVision::replying(Err(PortError::RateLimited));
        let request = AnalyzeRequest {
            image: Some(IMAGE.to_string()),
            options: labels(&["time"]),
            model: None,
        };
        let err = analyzer(vision, PromptSchema::Flat).analyze(&request).await.unwrap_err();
        assert_eq!(err, PortError::RateLimited);
    }
}
