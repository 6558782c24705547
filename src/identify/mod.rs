//! Food identification: photo and/or description → description + ingredients.
//!
//! With an image, the vision model is asked for a strict JSON object and
//! the response must contain one. Text-only requests ask for a looser
//! "description, then ingredient list" layout; JSON is still accepted if
//! the model returns it.
//!
//! Unparseable model output is an error. No placeholder meal is ever
//! substituted.

pub mod parse;
pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::providers::GenerativeModel;
use crate::types::{FoodIdentification, FoodInput, ImageData};
use crate::{PlatewiseError, Result};

/// Upper bound on one identification model call. Vision calls run longer
/// than text estimates, so this sits above the resolver's tier bound.
pub const DEFAULT_IDENTIFY_TIMEOUT: Duration = Duration::from_secs(60);

/// Turns user input into a [`FoodIdentification`] via a generative model.
#[derive(Clone)]
pub struct FoodIdentifier {
    model: Arc<dyn GenerativeModel>,
    call_timeout: Duration,
}

impl FoodIdentifier {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            model,
            call_timeout: DEFAULT_IDENTIFY_TIMEOUT,
        }
    }

    /// Bound each model call by `timeout`; expiry fails with `Timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Identify the food in `input`.
    ///
    /// Fails with `InvalidInput` (before any network call) when neither an
    /// image nor non-blank text is supplied, and with `Parse` when the model
    /// response cannot be interpreted.
    #[instrument(skip(self, input), fields(
        has_image = input.image.is_some(),
        has_text = input.description().is_some(),
    ))]
    pub async fn identify(&self, input: &FoodInput) -> Result<FoodIdentification> {
        if input.is_empty() {
            return Err(PlatewiseError::InvalidInput(
                "an image or a text description is required".to_string(),
            ));
        }

        let identification = match &input.image {
            Some(image) => {
                let prompt = prompt::image_prompt(input.description());
                let response = self.generate(&prompt, Some(image)).await?;
                parse::parse_json(&response).inspect_err(|e| {
                    warn!(error = %e, response = %truncate(&response), "unparseable image identification");
                })?
            }
            None => {
                // `is_empty` guarantees text is present here.
                let text = input.description().unwrap_or_default();
                let response = self.generate(&prompt::text_prompt(text), None).await?;
                parse::parse_json(&response)
                    .or_else(|_| parse::parse_listing(&response))
                    .inspect_err(|e| {
                        warn!(error = %e, response = %truncate(&response), "unparseable text identification");
                    })?
            }
        };

        debug!(
            description = %identification.description,
            ingredients = identification.ingredients.len(),
            "food identified"
        );
        Ok(identification)
    }

    async fn generate(&self, prompt: &str, image: Option<&ImageData>) -> Result<String> {
        tokio::time::timeout(self.call_timeout, self.model.generate(prompt, image))
            .await
            .map_err(|_| {
                warn!(
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "identification timed out"
                );
                PlatewiseError::Timeout(format!(
                    "identification exceeded {:?}",
                    self.call_timeout
                ))
            })?
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(300).collect()
}
