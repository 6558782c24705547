//! Last-resort macro estimate from the generative model.

use serde_json::Value;

use crate::extract::extract_json_object;
use crate::types::{NutritionRecord, amount_from_value};
use crate::{PlatewiseError, Result};

const ESTIMATE_RULES: &str = r#"Consider:
- Standard serving sizes
- Common preparation methods
- Similar items in nutrition databases
- Brand-specific nutrition if it is a branded item
- Regional or cultural variations if relevant

Base your estimates on reliable sources such as:
- USDA FoodData Central
- Restaurant nutrition facts
- Packaged food labels
- Standard recipe calculations

Respond ONLY with a JSON object in exactly this shape, protein/carbs/fat in grams:
{"calories": 0, "protein": 0, "carbs": 0, "fat": 0}"#;

/// Prompt asking for calories/protein/carbs/fat of `description`.
pub fn estimate_prompt(description: &str) -> String {
    format!(
        "Estimate the nutrition facts of this food or beverage: \"{}\".\n{ESTIMATE_RULES}",
        description.trim().replace('"', "'")
    )
}

/// Parse the first JSON object in `text` into a record.
///
/// All four fields must be present and numeric (a number, or a string
/// holding one); anything else is `Estimation`.
pub fn parse_estimate(text: &str) -> Result<NutritionRecord> {
    let map = extract_json_object(text).ok_or_else(|| {
        PlatewiseError::Estimation("no JSON object in model response".to_string())
    })?;

    let field = |name: &str| -> Result<f64> {
        map.get(name)
            .filter(|v| matches!(v, Value::Number(_) | Value::String(_)))
            .and_then(amount_from_value)
            .ok_or_else(|| PlatewiseError::Estimation(format!("\"{name}\" is missing or not numeric")))
    };

    Ok(NutritionRecord::new(
        field("calories")?,
        field("protein")?,
        field("carbs")?,
        field("fat")?,
    )
    .rounded())
}
