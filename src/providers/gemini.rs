//! Google Gemini client for vision and text generation.
//!
//! Uses the `generateContent` REST endpoint with the API key sent in the
//! `x-goog-api-key` header.
//! See: <https://ai.google.dev/api/generate-content>

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::traits::GenerativeModel;
use super::{DEFAULT_TIMEOUT, check_status, http_client, record_request};
use crate::types::ImageData;
use crate::{PlatewiseError, Result};

/// Default base URL for the Gemini API
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model: fast, multimodal.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const PROVIDER: &str = "gemini";

/// Client for the Gemini `generateContent` API.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    http: Client,
    base_url: String,
    model: String,
    temperature: Option<f32>,
}

impl GeminiClient {
    /// Create a new Gemini client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        Self::with_options(api_key, base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom base URL and request timeout.
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            http: http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(0.2),
        })
    }

    /// Use a different model (e.g. `gemini-1.5-pro`).
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sampling temperature; `None` leaves the server default.
    pub fn temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Model currently used for requests.
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Run one `generateContent` call and return the concatenated text parts.
    #[instrument(skip(self, prompt, image), fields(model = %self.model, has_image = image.is_some()))]
    pub async fn generate_content(&self, prompt: &str, image: Option<&ImageData>) -> Result<String> {
        let start = Instant::now();
        let result = self.send(prompt, image).await;
        record_request(PROVIDER, "generate", start, result.is_ok());
        result
    }

    async fn send(&self, prompt: &str, image: Option<&ImageData>) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let mut parts = vec![Part::Text { text: prompt }];
        if let Some(image) = image {
            parts.push(Part::InlineData {
                inline_data: Blob {
                    mime_type: &image.mime_type,
                    data: &image.data,
                },
            });
        }

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config: self.temperature.map(|temperature| GenerationConfig {
                temperature,
                candidate_count: 1,
            }),
        };

        debug!("sending request to Gemini");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let response = check_status(response, PROVIDER).await?;
        let body: GenerateResponse = response.json().await?;
        extract_text(body)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: GenerateResponse) -> Result<String> {
    if let Some(error) = body.error {
        return Err(PlatewiseError::Upstream {
            status: error.code.unwrap_or(500),
            message: error.message,
        });
    }

    let text: String = body
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(PlatewiseError::EmptyResponse);
    }
    Ok(text)
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    candidate_count: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    code: Option<u16>,
    message: String,
}

// ============================================================================
// Provider Trait Implementation
// ============================================================================

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, prompt: &str, image: Option<&ImageData>) -> Result<String> {
        self.generate_content(prompt, image).await
    }
}
