//! Macro nutrient record and resolution outcome types

use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

use super::ingredient::{MACRO_NUTRIENTS, Nutrient, find_nutrient, nutrient_amount};

/// Calories plus the three tracked macros (grams).
///
/// All fields are non-negative. Values are rounded to one decimal place
/// wherever records are aggregated; see [`NutritionRecord::rounded`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionRecord {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl NutritionRecord {
    /// Build a record, clamping negative or non-finite values to zero.
    pub fn new(calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self {
            calories: non_negative(calories),
            protein: non_negative(protein),
            carbs: non_negative(carbs),
            fat: non_negative(fat),
        }
    }

    /// The all-zero record.
    pub const fn zero() -> Self {
        Self {
            calories: 0.0,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
        }
    }

    /// Fixed minimal record offered to callers that prefer to show
    /// something rather than an "unknown" state.
    pub const fn placeholder() -> Self {
        Self {
            calories: 100.0,
            protein: 2.0,
            carbs: 15.0,
            fat: 5.0,
        }
    }

    /// Pick `Calories`, `Protein`, `Carbohydrates` and `Fat` out of a
    /// nutrient list by case-insensitive name; missing entries are zero.
    pub fn from_nutrients(nutrients: &[Nutrient]) -> Self {
        Self::new(
            nutrient_amount(nutrients, "Calories"),
            nutrient_amount(nutrients, "Protein"),
            nutrient_amount(nutrients, "Carbohydrates"),
            nutrient_amount(nutrients, "Fat"),
        )
    }

    /// Like [`from_nutrients`](Self::from_nutrients), but `None` when the
    /// list names none of the four macros.
    pub fn try_from_nutrients(nutrients: &[Nutrient]) -> Option<Self> {
        MACRO_NUTRIENTS
            .iter()
            .any(|name| find_nutrient(nutrients, name).is_some())
            .then(|| Self::from_nutrients(nutrients))
    }

    /// Multiply every field by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(
            self.calories * factor,
            self.protein * factor,
            self.carbs * factor,
            self.fat * factor,
        )
    }

    /// Round every field to one decimal place.
    pub fn rounded(&self) -> Self {
        Self::new(
            round1(self.calories),
            round1(self.protein),
            round1(self.carbs),
            round1(self.fat),
        )
    }

    /// `self + other`, rounded to one decimal place.
    pub fn accumulate(&self, other: &NutritionRecord) -> Self {
        (*self + *other).rounded()
    }

    /// True when every field is zero.
    pub fn is_zero(&self) -> bool {
        self.calories == 0.0 && self.protein == 0.0 && self.carbs == 0.0 && self.fat == 0.0
    }
}

impl Add for NutritionRecord {
    type Output = NutritionRecord;

    fn add(self, rhs: NutritionRecord) -> NutritionRecord {
        NutritionRecord::new(
            self.calories + rhs.calories,
            self.protein + rhs.protein,
            self.carbs + rhs.carbs,
            self.fat + rhs.fat,
        )
    }
}

impl fmt::Display for NutritionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} kcal, {} g protein, {} g carbs, {} g fat",
            self.calories, self.protein, self.carbs, self.fat
        )
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Resolution strategy, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Packaged/branded product database.
    ProductSearch,
    /// Recipe database.
    RecipeSearch,
    /// Parsed ingredient list, summed per ingredient.
    IngredientSum,
    /// Generative model estimate.
    ModelEstimate,
}

impl Tier {
    /// Metric/log label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::ProductSearch => "product_search",
            Tier::RecipeSearch => "recipe_search",
            Tier::IngredientSum => "ingredient_sum",
            Tier::ModelEstimate => "model_estimate",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record together with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedNutrition {
    pub record: NutritionRecord,
    pub tier: Tier,
    /// Name of the floor rule that replaced the computed total, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_rule: Option<String>,
}

/// Outcome of nutrition resolution for one meal.
///
/// `Unresolved` is returned instead of made-up numbers; callers that want
/// the old smoothing behaviour use [`record_or_placeholder`](Self::record_or_placeholder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NutritionOutcome {
    Resolved(ResolvedNutrition),
    Unresolved { reason: String },
}

impl NutritionOutcome {
    /// The resolved record, if any.
    pub fn record(&self) -> Option<&NutritionRecord> {
        match self {
            NutritionOutcome::Resolved(resolved) => Some(&resolved.record),
            NutritionOutcome::Unresolved { .. } => None,
        }
    }

    /// The resolved record, or [`NutritionRecord::placeholder`].
    pub fn record_or_placeholder(&self) -> NutritionRecord {
        self.record()
            .copied()
            .unwrap_or_else(NutritionRecord::placeholder)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, NutritionOutcome::Resolved(_))
    }
}
