//! Provider traits for the two external collaborators.
//!
//! The pipeline never talks to HTTP directly. It holds an
//! `Arc<dyn GenerativeModel>` and an `Arc<dyn NutritionDatabase>`, built
//! once at startup and injected through the builder. This enables:
//! - Decorator patterns: `RetryingGenerativeModel`, `RetryingNutritionDatabase`
//! - Stub implementations in tests, with call counting
//!
//! # Error semantics
//!
//! Providers return `Ok(None)` / empty collections when the upstream had
//! nothing to say, and `Err` for transport, status or decoding failures.
//! The resolver decides which of those end a tier; providers don't.

use async_trait::async_trait;

use crate::Result;
use crate::types::{ImageData, Nutrient, NutritionRecord, ParsedIngredient};

// ============================================================================
// Generative Model
// ============================================================================

/// Vision/text generative model.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Provider name for logging/metrics.
    fn name(&self) -> &str;

    /// Generate free-form text for `prompt`, optionally grounded on an image.
    ///
    /// Returns `EmptyResponse` when the model produced no text.
    async fn generate(&self, prompt: &str, image: Option<&ImageData>) -> Result<String>;
}

// ============================================================================
// Nutrition Database
// ============================================================================

/// Food/recipe/ingredient nutrition database.
#[async_trait]
pub trait NutritionDatabase: Send + Sync {
    /// Provider name for logging/metrics.
    fn name(&self) -> &str;

    /// Best packaged-product match for `query`, if it carries nutrition data.
    async fn search_product(&self, query: &str) -> Result<Option<NutritionRecord>>;

    /// Best recipe match for `query`, if it carries nutrition data.
    async fn search_recipe(&self, query: &str) -> Result<Option<NutritionRecord>>;

    /// Resolve free-text ingredient lines to database ingredients.
    ///
    /// The result is in input order; unmatched lines come back with `id <= 0`.
    async fn parse_ingredients(&self, ingredients: &[String]) -> Result<Vec<ParsedIngredient>>;

    /// Calories/protein/carbohydrates/fat for one parsed ingredient at its
    /// parsed amount.
    async fn ingredient_nutrients(&self, ingredient: &ParsedIngredient) -> Result<Vec<Nutrient>>;
}
