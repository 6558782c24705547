//! Meal input and identification types

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::nutrition::NutritionOutcome;

/// Inline image payload sent to the vision model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub mime_type: String,
    /// Base64-encoded image bytes (standard alphabet, padded).
    pub data: String,
}

impl ImageData {
    /// Wrap an already base64-encoded payload.
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Encode raw image bytes.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(mime_type, STANDARD.encode(bytes))
    }

    /// Accept either a `data:image/<type>;base64,<payload>` URL or a bare
    /// base64 payload, which is assumed to be JPEG.
    pub fn from_data_url(input: &str) -> Self {
        let trimmed = input.trim();
        if let Some(rest) = trimmed.strip_prefix("data:") {
            if let Some((header, payload)) = rest.split_once(',') {
                let mime = header.strip_suffix(";base64").unwrap_or(header);
                let mime = if mime.is_empty() { "image/jpeg" } else { mime };
                return Self::new(mime, payload);
            }
        }
        Self::new("image/jpeg", trimmed)
    }

    /// Guess a MIME type from a file extension, defaulting to JPEG.
    pub fn mime_for_extension(ext: &str) -> &'static str {
        match ext.to_ascii_lowercase().as_str() {
            "png" => "image/png",
            "webp" => "image/webp",
            "heic" => "image/heic",
            "heif" => "image/heif",
            "gif" => "image/gif",
            _ => "image/jpeg",
        }
    }
}

/// What the user supplied for one analysis: a photo, a description, or both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoodInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl FoodInput {
    pub fn image(image: ImageData) -> Self {
        Self {
            image: Some(image),
            text: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            image: None,
            text: Some(text.into()),
        }
    }

    /// Attach a free-text description to this input.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Description text, with blank strings treated as absent.
    pub fn description(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// True when neither an image nor usable text is present.
    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.description().is_none()
    }
}

/// Structured description of a meal produced by the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodIdentification {
    pub description: String,
    pub ingredients: Vec<String>,
}

/// Result of a full analysis: what was identified and its nutrition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealAnalysis {
    pub identification: FoodIdentification,
    pub nutrition: NutritionOutcome,
}
