//! crates/image_prompt_core/src/image.rs
//!
//! Parsing and building of `data:image/<subtype>;base64,<payload>` URLs.

use crate::ports::{PortError, PortResult};
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static DATA_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^data:image/([^;]+);base64,(.+)$").expect("data URL pattern is valid")
});

/// A parsed image data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    subtype: String,
    payload: String,
}

impl DataUrl {
    /// Parses a data URL string; anything else is rejected as invalid input.
    pub fn parse(value: &str) -> PortResult<Self> {
        let caps = DATA_URL_PATTERN
            .captures(value)
            .ok_or_else(|| PortError::InvalidInput("Invalid image format".to_string()))?;
        Ok(Self {
            subtype: caps[1].to_string(),
            payload: caps[2].to_string(),
        })
    }

    /// Builds a data URL from raw image bytes, sniffing the mime type.
    ///
    /// Returns `None` when the bytes are not a recognised image.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let kind = infer::get(data)?;
        let subtype = kind.mime_type().strip_prefix("image/")?;
        Some(Self {
            subtype: subtype.to_string(),
            payload: general_purpose::STANDARD.encode(data),
        })
    }

    pub fn mime_type(&self) -> String {
        format!("image/{}", self.subtype)
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// A file extension suitable for saving the decoded image.
    pub fn file_extension(&self) -> &str {
        match self.subtype.as_str() {
            "jpeg" | "jpg" | "pjpeg" => "jpg",
            "svg+xml" => "svg",
            other => other,
        }
    }

    pub fn decode(&self) -> PortResult<Bytes> {
        general_purpose::STANDARD
            .decode(self.payload.trim())
            .map(Bytes::from)
            .map_err(|e| PortError::InvalidInput(format!("Invalid base64 image payload: {}", e)))
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:image/{};base64,{}", self.subtype, self.payload)
    }
}
