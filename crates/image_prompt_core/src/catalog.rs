//! crates/image_prompt_core/src/catalog.rs
//!
//! Static catalogs: the ten prompt options and the selectable models.

use crate::domain::{ModelInfo, PromptOption};

/// `(id, labelAr, labelEn, emoji)` for every option, in display order.
const OPTION_CATALOG: [(&str, &str, &str, &str); 10] = [
    ("camera_angle", "زاوية الكاميرا", "Camera Angle", "📷"),
    ("camera_effects", "تأثيرات الكاميرا", "Camera Effects", "🎬"),
    ("environment", "البيئة المحيطة", "Environment", "🌍"),
    ("colors", "الألوان", "Colors", "🎨"),
    ("materials", "الخامات والمواد", "Materials & Textures", "🧱"),
    ("lighting", "الإضاءة", "Lighting", "💡"),
    ("time", "التوقيت", "Time of Day", "⏰"),
    ("art_style", "أسلوب الصورة", "Art Style", "🖼️"),
    ("mood", "التعبيرات والمشاعر", "Mood & Emotion", "😊"),
    ("composition", "التكوين", "Composition", "📐"),
];

pub const ANALYSIS_MODELS: [ModelInfo; 5] = [
    ModelInfo {
        id: "google/gemini-3-flash-preview",
        label: "Gemini 3 Flash",
        description: "سريع ومتوازن",
    },
    ModelInfo {
        id: "google/gemini-2.5-flash",
        label: "Gemini 2.5 Flash",
        description: "متوازن وموثوق",
    },
    ModelInfo {
        id: "google/gemini-2.5-flash-lite",
        label: "Gemini 2.5 Flash Lite",
        description: "الأسرع والأخف",
    },
    ModelInfo {
        id: "google/gemini-2.5-pro",
        label: "Gemini 2.5 Pro",
        description: "الأقوى والأدق",
    },
    ModelInfo {
        id: "google/gemini-3-pro-preview",
        label: "Gemini 3 Pro",
        description: "الجيل الجديد الأقوى",
    },
];

pub const IMAGE_MODELS: [ModelInfo; 2] = [
    ModelInfo {
        id: "google/gemini-2.5-flash-image",
        label: "Nano Banana 2",
        description: "سريع ومتوازن لإنشاء الصور",
    },
    ModelInfo {
        id: "google/gemini-3-pro-image-preview",
        label: "Nano Banana Pro",
        description: "جودة أعلى وأبطأ",
    },
];

/// The analysis model a new client session starts with.
pub const DEFAULT_CLIENT_ANALYSIS_MODEL: &str = "google/gemini-3-flash-preview";
/// The analysis model the relay falls back to when a request names none.
pub const DEFAULT_RELAY_ANALYSIS_MODEL: &str = "google/gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "google/gemini-2.5-flash-image";

/// Returns the full option catalog with every option enabled.
pub fn default_options() -> Vec<PromptOption> {
    OPTION_CATALOG
        .iter()
        .map(|(id, label_ar, label_en, emoji)| PromptOption {
            id: (*id).to_string(),
            label_ar: (*label_ar).to_string(),
            label_en: (*label_en).to_string(),
            emoji: (*emoji).to_string(),
            enabled: true,
        })
        .collect()
}

/// Maps an English option label (a section key) to its Arabic label.
pub fn arabic_label_for(label_en: &str) -> Option<&'static str> {
    OPTION_CATALOG
        .iter()
        .find(|(_, _, en, _)| *en == label_en)
        .map(|(_, ar, _, _)| *ar)
}

pub fn find_analysis_model(id: &str) -> Option<&'static ModelInfo> {
    ANALYSIS_MODELS.iter().find(|m| m.id == id)
}

pub fn find_image_model(id: &str) -> Option<&'static ModelInfo> {
    IMAGE_MODELS.iter().find(|m| m.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn option_catalog_is_fully_enabled_with_unique_ids() {
        let options = default_options();
        assert_eq!(options.len(), 10);
        assert!(options.iter().all(|o| o.enabled));
        let ids: HashSet<_> = options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn defaults_are_listed_in_their_catalogs() {
        assert!(find_analysis_model(DEFAULT_CLIENT_ANALYSIS_MODEL).is_some());
        assert!(find_analysis_model(DEFAULT_RELAY_ANALYSIS_MODEL).is_some());
        assert!(find_image_model(DEFAULT_IMAGE_MODEL).is_some());
        assert!(find_image_model("acme/unknown").is_none());
    }

    #[test]
    fn arabic_labels_resolve_by_english_label() {
        assert_eq!(arabic_label_for("Materials & Textures"), Some("الخامات والمواد"));
        assert_eq!(arabic_label_for("Shadows"), None);
    }
}
