//! crates/image_prompt_core/src/normalize.rs
//!
//! Turns a vision model's free-form reply into one of the analysis schemas.
//!
//! The model is asked for a bare JSON object but does not always comply, so
//! every reply goes through three tiers: a direct parse, extraction of an
//! embedded object carrying the schema's keys, and finally a degraded result
//! built from the raw text. Only an empty reply is an error.

use crate::domain::{FlatPrompt, StructuredPrompt};
use crate::ports::{PortError, PortResult};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

/// Which tier produced a normalized value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationTier {
    Direct,
    Extracted,
    Degraded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub value: T,
    pub tier: NormalizationTier,
}

/// A schema that can be recovered from untrusted model text.
pub trait TextToStructuredData: DeserializeOwned + Sized {
    /// Top-level keys an embedded object must mention to be considered.
    const REQUIRED_KEYS: &'static [&'static str];

    /// The result used when no JSON can be recovered from `reply`.
    fn degraded(reply: &str) -> Self;

    fn from_model_reply(reply: &str) -> PortResult<Normalized<Self>> {
        if reply.trim().is_empty() {
            return Err(PortError::EmptyReply);
        }

        if let Ok(value) = serde_json::from_str::<Self>(reply) {
            return Ok(Normalized { value, tier: NormalizationTier::Direct });
        }

        if let Some(value) = extract_embedded::<Self>(reply) {
            debug!("Recovered JSON object embedded in model reply");
            return Ok(Normalized { value, tier: NormalizationTier::Extracted });
        }

        warn!(
            "Model reply was not usable JSON ({} chars), falling back to raw text",
            reply.chars().count()
        );
        Ok(Normalized {
            value: Self::degraded(reply),
            tier: NormalizationTier::Degraded,
        })
    }
}

/// Returns the first object embedded in `reply` that carries every required
/// key at its top level and reads as `T`.
///
/// Every `{` is tried as a start, so stray braces in surrounding prose do
/// not hide a well-formed object that follows them.
fn extract_embedded<T: TextToStructuredData>(reply: &str) -> Option<T> {
    reply
        .char_indices()
        .filter(|(_, c)| *c == '{')
        .find_map(|(start, _)| {
            let candidate = serde_json::Deserializer::from_str(&reply[start..])
                .into_iter::<Value>()
                .next()?
                .ok()?;
            let object = candidate.as_object()?;
            if !T::REQUIRED_KEYS.iter().all(|key| object.contains_key(*key)) {
                return None;
            }
            match serde_json::from_value::<T>(candidate) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!("Embedded object did not match the schema: {}", e);
                    None
                }
            }
        })
}

pub const FALLBACK_TITLE_AR: &str = "وصف الصورة";
pub const FALLBACK_TITLE_EN: &str = "Image Description";

impl TextToStructuredData for StructuredPrompt {
    const REQUIRED_KEYS: &'static [&'static str] = &["sections"];

    fn degraded(reply: &str) -> Self {
        Self {
            title_ar: FALLBACK_TITLE_AR.to_string(),
            title_en: FALLBACK_TITLE_EN.to_string(),
            overview_ar: reply.to_string(),
            overview_en: reply.to_string(),
            sections: IndexMap::new(),
        }
    }
}

impl TextToStructuredData for FlatPrompt {
    const REQUIRED_KEYS: &'static [&'static str] = &["promptAr", "promptEn"];

    fn degraded(reply: &str) -> Self {
        Self {
            prompt_ar: reply.to_string(),
            prompt_en: reply.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PromptSection;

    const STRUCTURED_JSON: &str = r#"{"titleAr":"غروب","titleEn":"Sunset","overviewAr":"شاطئ","overviewEn":"A beach","sections":{"Lighting":{"ar":"دافئة","en":"Warm"},"Colors":{"ar":"برتقالي","en":"Orange"}}}"#;

    #[test]
    fn well_formed_reply_is_returned_unchanged() {
        let out = StructuredPrompt::from_model_reply(STRUCTURED_JSON).unwrap();
        assert_eq!(out.tier, NormalizationTier::Direct);
        let reserialized = serde_json::to_string(&out.value).unwrap();
        assert_eq!(reserialized, STRUCTURED_JSON);
        let keys: Vec<_> = out.value.sections.keys().cloned().collect();
        assert_eq!(keys, ["Lighting", "Colors"]);
    }

    #[test]
    fn markdown_fenced_json_is_extracted() {
        let reply = format!("Here is the analysis:\n```json\n{}\n```\nEnjoy!", STRUCTURED_JSON);
        let out = StructuredPrompt::from_model_reply(&reply).unwrap();
        assert_eq!(out.tier, NormalizationTier::Extracted);
        assert_eq!(out.value.title_en, "Sunset");
        assert_eq!(
            out.value.sections.get("Lighting"),
            Some(&PromptSection { ar: "دافئة".into(), en: "Warm".into() })
        );
    }

    #[test]
    fn flat_fenced_json_is_extracted() {
        let reply = "```json\n{\"promptAr\": \"قطة\", \"promptEn\": \"A cat\"}\n```";
        let out = FlatPrompt::from_model_reply(reply).unwrap();
        assert_eq!(out.tier, NormalizationTier::Extracted);
        assert_eq!(out.value.prompt_en, "A cat");
    }

    #[test]
    fn plain_text_degrades_into_both_languages() {
        let reply = "A cat sleeping on a windowsill in soft light.";

        let flat = FlatPrompt::from_model_reply(reply).unwrap();
        assert_eq!(flat.tier, NormalizationTier::Degraded);
        assert_eq!(flat.value.prompt_ar, reply);
        assert_eq!(flat.value.prompt_en, reply);

        let structured = StructuredPrompt::from_model_reply(reply).unwrap();
        assert_eq!(structured.tier, NormalizationTier::Degraded);
        assert_eq!(structured.value.overview_ar, reply);
        assert_eq!(structured.value.overview_en, reply);
        assert!(structured.value.sections.is_empty());
        assert_eq!(structured.value.title_en, FALLBACK_TITLE_EN);
    }

    #[test]
    fn broken_embedded_json_degrades_instead_of_failing() {
        let reply = r#"Sure! {"titleAr": "غروب", "sections": {"Lighting": oops}}"#;
        let out = StructuredPrompt::from_model_reply(reply).unwrap();
        assert_eq!(out.tier, NormalizationTier::Degraded);
        assert_eq!(out.value.overview_en, reply);
    }

    #[test]
    fn object_without_required_keys_is_not_extracted() {
        let reply = r#"Result: {"caption": "a dog"}"#;
        let out = FlatPrompt::from_model_reply(reply).unwrap();
        assert_eq!(out.tier, NormalizationTier::Degraded);
    }

    #[test]
    fn missing_and_null_fields_read_as_empty_text() {
        let reply = r#"{"titleAr":"غروب","titleEn":"Sunset","overviewAr":null,"overviewEn":"A beach","sections":{"Lighting":{"en":"Warm"},"Colors":{"ar":"برتقالي","en":null}}}"#;
        let out = StructuredPrompt::from_model_reply(reply).unwrap();
        assert_eq!(out.tier, NormalizationTier::Direct);
        assert_eq!(out.value.title_en, "Sunset");
        assert_eq!(out.value.overview_ar, "");
        assert_eq!(out.value.overview_en, "A beach");
        assert_eq!(
            out.value.sections["Lighting"],
            PromptSection { ar: String::new(), en: "Warm".into() }
        );
        assert_eq!(
            out.value.sections["Colors"],
            PromptSection { ar: "برتقالي".into(), en: String::new() }
        );
    }

    #[test]
    fn reply_without_overview_keeps_its_sections() {
        let reply = r#"{"titleAr":"غروب","titleEn":"Sunset","overviewEn":"A beach","sections":{"Lighting":{"ar":"دافئة","en":"Warm"}}}"#;
        let out = StructuredPrompt::from_model_reply(reply).unwrap();
        assert_eq!(out.tier, NormalizationTier::Direct);
        assert_eq!(out.value.title_en, "Sunset");
        assert_eq!(out.value.sections.len(), 1);
    }

    #[test]
    fn embedded_object_without_titles_is_still_extracted() {
        let reply = r#"Here it is: {"overviewEn":"A beach","sections":{"Lighting":{"ar":"دافئة","en":"Warm"}}}"#;
        let out = StructuredPrompt::from_model_reply(reply).unwrap();
        assert_eq!(out.tier, NormalizationTier::Extracted);
        assert_eq!(out.value.title_en, "");
        assert_eq!(out.value.sections["Lighting"].en, "Warm");
    }

    #[test]
    fn object_without_sections_is_not_a_structured_prompt() {
        let out = StructuredPrompt::from_model_reply(r#"{"titleEn":"Sunset"}"#).unwrap();
        assert_eq!(out.tier, NormalizationTier::Degraded);
    }

    #[test]
    fn braces_in_leading_prose_do_not_hide_the_object() {
        let reply = format!("Aspects covered: {{Lighting}}.\n```json\n{}\n```", STRUCTURED_JSON);
        let out = StructuredPrompt::from_model_reply(&reply).unwrap();
        assert_eq!(out.tier, NormalizationTier::Extracted);
        assert_eq!(out.value.title_en, "Sunset");
        assert_eq!(out.value.sections.len(), 2);
    }

    #[test]
    fn nested_object_is_not_mistaken_for_the_prompt() {
        let reply = r#"Note: {"sections": "see below"} then {"titleAr":"غروب","titleEn":"Sunset","overviewAr":"شاطئ","overviewEn":"A beach","sections":{}}"#;
        let out = StructuredPrompt::from_model_reply(reply).unwrap();
        assert_eq!(out.tier, NormalizationTier::Extracted);
        assert_eq!(out.value.title_en, "Sunset");
    }

    #[test]
    fn empty_reply_is_an_error() {
        assert_eq!(StructuredPrompt::from_model_reply("  \n").unwrap_err(), PortError::EmptyReply);
        assert_eq!(FlatPrompt::from_model_reply("").unwrap_err(), PortError::EmptyReply);
    }
}
