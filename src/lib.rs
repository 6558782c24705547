//! Platewise - meal photo/description to calories and macros
//!
//! A generative vision model identifies the food and its ingredients; a
//! tiered resolver then looks the meal up in a nutrition database (product
//! search, recipe search, per-ingredient sum) and falls back to a model
//! estimate. Ingredient sums pass through a floor-rule aggregator that
//! corrects implausibly low totals.
//!
//! # Example
//!
//! ```rust,no_run
//! use platewise::{FoodInput, Platewise};
//!
//! #[tokio::main]
//! async fn main() -> platewise::Result<()> {
//!     let analyzer = Platewise::builder()
//!         .gemini("gemini-api-key")
//!         .spoonacular("spoonacular-api-key")
//!         .build()?;
//!
//!     let analysis = analyzer
//!         .analyze(&FoodInput::text("two scrambled eggs on toast"))
//!         .await?;
//!
//!     println!("{}", analysis.identification.description);
//!     match analysis.nutrition.record() {
//!         Some(record) => println!("{record}"),
//!         None => println!("nutrition unavailable"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod identify;
pub mod pipeline;
pub mod providers;
pub mod resolve;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use aggregate::{AggregationContext, Aggregated, Aggregator, FloorKind, FloorRule};
pub use cache::{CacheConfig, IngredientCache};
pub use config::{Config, Secrets};
pub use error::{PlatewiseError, Result};
pub use identify::FoodIdentifier;
pub use pipeline::{MealAnalyzer, Platewise, PlatewiseBuilder};
pub use providers::{
    GeminiClient, GenerativeModel, NutritionDatabase, RetryConfig, RetryingGenerativeModel,
    RetryingNutritionDatabase, SpoonacularClient,
};
pub use resolve::{NutritionResolver, ResolverConfig};

pub use types::{
    FoodIdentification, FoodInput, ImageData, MealAnalysis, Nutrient, NutritionOutcome,
    NutritionRecord, ParsedIngredient, ResolvedNutrition, Tier,
};
