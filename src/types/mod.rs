//! Public types for the Platewise API.

mod food;
mod ingredient;
mod nutrition;

pub use food::{FoodIdentification, FoodInput, ImageData, MealAnalysis};
pub use ingredient::{Nutrient, ParsedIngredient, find_nutrient, nutrient_amount};
pub(crate) use ingredient::{MACRO_NUTRIENTS, amount_from_value, lenient_optional_amount};
pub use nutrition::{NutritionOutcome, NutritionRecord, ResolvedNutrition, Tier};
