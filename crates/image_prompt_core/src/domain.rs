//! crates/image_prompt_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! The wire names (camelCase) are part of the relay contract, so the serde
//! attributes live here next to the types.

use crate::catalog;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Prompt Options
//=========================================================================================

/// A togglable aspect of the image that the analysis relay is asked to describe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptOption {
    pub id: String,
    pub label_ar: String,
    pub label_en: String,
    pub emoji: String,
    pub enabled: bool,
}

//=========================================================================================
// Analysis Results
//=========================================================================================

/// Which analysis response shape a deployment uses. Client and relay must agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptSchema {
    #[default]
    Structured,
    Flat,
}

impl FromStr for PromptSchema {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "structured" => Ok(Self::Structured),
            "flat" => Ok(Self::Flat),
            other => Err(format!("'{}' is not a known prompt schema", other)),
        }
    }
}

impl fmt::Display for PromptSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured => f.write_str("structured"),
            Self::Flat => f.write_str("flat"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Arabic,
    English,
}

/// One bilingual section of a structured prompt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PromptSection {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ar: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub en: String,
}

impl PromptSection {
    pub fn text(&self, lang: Language) -> &str {
        match lang {
            Language::Arabic => &self.ar,
            Language::English => &self.en,
        }
    }
}

/// The bilingual, section-keyed description of an image.
///
/// Section keys are the English option labels that were enabled for the
/// analysis call, in the order the model returned them.
///
/// Only `sections` is mandatory on input; a missing or `null` title or
/// overview reads as empty text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredPrompt {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title_ar: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title_en: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub overview_ar: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub overview_en: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sections: IndexMap<String, PromptSection>,
}

impl StructuredPrompt {
    /// Renders the whole prompt as a single block of text in one language.
    ///
    /// Arabic output swaps the English section keys for their Arabic catalog
    /// labels where one exists.
    pub fn full_text(&self, lang: Language) -> String {
        let (title, overview) = match lang {
            Language::Arabic => (&self.title_ar, &self.overview_ar),
            Language::English => (&self.title_en, &self.overview_en),
        };
        let mut text = format!("{}\n{}\n\n", title, overview);
        for (key, section) in &self.sections {
            let label = match lang {
                Language::Arabic => catalog::arabic_label_for(key).unwrap_or(key.as_str()),
                Language::English => key.as_str(),
            };
            text.push_str(&format!("{}\n{}\n\n", label, section.text(lang)));
        }
        text.trim().to_string()
    }
}

/// The legacy two-field analysis result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatPrompt {
    #[serde(deserialize_with = "null_as_default")]
    pub prompt_ar: String,
    #[serde(deserialize_with = "null_as_default")]
    pub prompt_en: String,
}

/// Reads an explicit `null` as the type's empty value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The body of a successful analysis response. Exactly one shape per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    Structured(StructuredPrompt),
    Flat(FlatPrompt),
}

impl AnalysisResult {
    pub fn schema(&self) -> PromptSchema {
        match self {
            Self::Structured(_) => PromptSchema::Structured,
            Self::Flat(_) => PromptSchema::Flat,
        }
    }

    pub fn full_text(&self, lang: Language) -> String {
        match self {
            Self::Structured(prompt) => prompt.full_text(lang),
            Self::Flat(prompt) => match lang {
                Language::Arabic => prompt.prompt_ar.clone(),
                Language::English => prompt.prompt_en.clone(),
            },
        }
    }
}

//=========================================================================================
// Images and Models
//=========================================================================================

/// An image produced by the image model, plus any text it sent alongside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedImage {
    /// A data URL or a remote URL, passed through as the gateway returned it.
    pub image: String,
    pub text: String,
}

/// An entry of the static model catalogs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StructuredPrompt {
        let mut sections = IndexMap::new();
        sections.insert(
            "Lighting".to_string(),
            PromptSection { ar: "إضاءة ذهبية".into(), en: "Golden light".into() },
        );
        sections.insert(
            "Unlisted".to_string(),
            PromptSection { ar: "نص".into(), en: "text".into() },
        );
        StructuredPrompt {
            title_ar: "عنوان".into(),
            title_en: "Title".into(),
            overview_ar: "نظرة".into(),
            overview_en: "Overview".into(),
            sections,
        }
    }

    #[test]
    fn english_full_text_concatenates_title_overview_and_sections() {
        assert_eq!(
            sample().full_text(Language::English),
            "Title\nOverview\n\nLighting\nGolden light\n\nUnlisted\ntext"
        );
    }

    #[test]
    fn arabic_full_text_uses_catalog_labels_and_falls_back_to_key() {
        assert_eq!(
            sample().full_text(Language::Arabic),
            "عنوان\nنظرة\n\nالإضاءة\nإضاءة ذهبية\n\nUnlisted\nنص"
        );
    }

    #[test]
    fn untagged_result_serializes_to_the_bare_schema() {
        let flat = AnalysisResult::Flat(FlatPrompt {
            prompt_ar: "أ".into(),
            prompt_en: "a".into(),
        });
        let json = serde_json::to_value(&flat).unwrap();
        assert_eq!(json, serde_json::json!({"promptAr": "أ", "promptEn": "a"}));
        assert_eq!(flat.schema(), PromptSchema::Flat);
    }

    #[test]
    fn schema_parses_case_insensitively() {
        assert_eq!("Flat".parse::<PromptSchema>(), Ok(PromptSchema::Flat));
        assert_eq!(" structured ".parse::<PromptSchema>(), Ok(PromptSchema::Structured));
        assert!("nested".parse::<PromptSchema>().is_err());
    }
}
