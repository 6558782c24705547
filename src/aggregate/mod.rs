//! Nutrition aggregation and normalization.
//!
//! [`sum_nutrients`] folds per-ingredient nutrient lists into one record,
//! rounding the running total after each addition. [`Aggregator`] then
//! runs the floor rule table over the sum and guarantees the output
//! invariant: non-negative, at most one decimal place.

pub mod rules;

use tracing::info;

use crate::telemetry;
use crate::types::{Nutrient, NutritionRecord};

pub use rules::{FloorKind, FloorRule, RuleInput, default_rules};

/// What the floor rules see about the meal.
#[derive(Debug, Clone, Default)]
pub struct AggregationContext {
    /// Free text used for quantity and food-name detection.
    pub description: String,
    /// Ingredient strings as identified (pre-parse).
    pub ingredients: Vec<String>,
}

impl AggregationContext {
    /// Context built the way the resolver builds it for an ingredient sum:
    /// the description is the ingredient list joined by spaces.
    pub fn from_ingredients(ingredients: &[String]) -> Self {
        Self {
            description: ingredients.join(" "),
            ingredients: ingredients.to_vec(),
        }
    }

    fn rule_input(&self) -> RuleInput {
        let description = self.description.to_lowercase();
        RuleInput {
            count: detect_quantity(&description),
            description,
            ingredients: self.ingredients.iter().map(|i| i.to_lowercase()).collect(),
        }
    }
}

/// Aggregated record plus the rule that produced it, if one fired.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated {
    pub record: NutritionRecord,
    pub rule: Option<String>,
}

/// Applies the floor rule table to computed totals.
#[derive(Debug, Clone)]
pub struct Aggregator {
    rules: Vec<FloorRule>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl Aggregator {
    /// Aggregator with a custom rule table (evaluated in order).
    pub fn new(rules: Vec<FloorRule>) -> Self {
        Self { rules }
    }

    /// Aggregator that only normalizes (no floors).
    pub fn without_rules() -> Self {
        Self::new(Vec::new())
    }

    pub fn rules(&self) -> &[FloorRule] {
        &self.rules
    }

    /// Normalize `partial`, replacing it with the first matching floor.
    pub fn aggregate(&self, partial: NutritionRecord, ctx: &AggregationContext) -> Aggregated {
        let partial = partial.rounded();
        let input = ctx.rule_input();

        for rule in &self.rules {
            if let Some(floor) = rule.apply(&partial, &input) {
                let record = floor.rounded();
                info!(
                    rule = %rule.name,
                    computed_calories = partial.calories,
                    floor_calories = record.calories,
                    count = input.count,
                    "floor rule replaced computed nutrition"
                );
                metrics::counter!(telemetry::FLOOR_RULES_TOTAL, "rule" => rule.name.clone())
                    .increment(1);
                return Aggregated {
                    record,
                    rule: Some(rule.name.clone()),
                };
            }
        }

        Aggregated {
            record: partial,
            rule: None,
        }
    }
}

/// Sum macro nutrients across ingredients, rounding after each addition.
pub fn sum_nutrients<'a, I>(ingredients: I) -> NutritionRecord
where
    I: IntoIterator<Item = &'a [Nutrient]>,
{
    ingredients
        .into_iter()
        .fold(NutritionRecord::zero(), |total, nutrients| {
            total.accumulate(&NutritionRecord::from_nutrients(nutrients))
        })
}

/// First integer in `text`, or 1 when there is none (or it is zero).
pub fn detect_quantity(text: &str) -> f64 {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    match digits.parse::<u32>() {
        Ok(n) if n > 0 => f64::from(n),
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nutrient(name: &str, amount: f64) -> Nutrient {
        Nutrient {
            name: name.to_string(),
            amount,
            unit: String::new(),
        }
    }

    #[test]
    fn quantity_detection() {
        assert_eq!(detect_quantity("2 apples"), 2.0);
        assert_eq!(detect_quantity("a slice of 12 inch pizza"), 12.0);
        assert_eq!(detect_quantity("toast"), 1.0);
        assert_eq!(detect_quantity("0 calorie soda"), 1.0);
    }

    #[test]
    fn two_apples_floor() {
        let aggregated = Aggregator::default().aggregate(
            NutritionRecord::new(40.0, 0.2, 10.0, 0.1),
            &AggregationContext {
                description: "2 apples".into(),
                ingredients: vec!["2 apples".into()],
            },
        );
        assert_eq!(
            aggregated.record,
            NutritionRecord::new(190.0, 1.0, 50.0, 0.6)
        );
        assert_eq!(aggregated.rule.as_deref(), Some("apple"));
    }

    #[test]
    fn dessert_floor() {
        let aggregated = Aggregator::default().aggregate(
            NutritionRecord::new(120.0, 2.0, 18.0, 4.0),
            &AggregationContext::from_ingredients(&["chocolate cake".to_string()]),
        );
        assert_eq!(
            aggregated.record,
            NutritionRecord::new(350.0, 5.0, 45.0, 18.0)
        );
        assert_eq!(aggregated.rule.as_deref(), Some("dessert"));
    }

    #[test]
    fn generic_floor_scales_by_count() {
        let aggregated = Aggregator::default().aggregate(
            NutritionRecord::new(30.0, 1.0, 2.0, 1.0),
            &AggregationContext::from_ingredients(&["2 slices bread".to_string()]),
        );
        assert_eq!(aggregated.record, NutritionRecord::new(200.0, 4.0, 30.0, 10.0));
        assert_eq!(aggregated.rule.as_deref(), Some("minimum"));
    }

    #[test]
    fn plausible_totals_pass_through_rounded() {
        let aggregated = Aggregator::default().aggregate(
            NutritionRecord::new(512.345, 20.06, 60.04, 18.96),
            &AggregationContext::from_ingredients(&["1 burrito".to_string()]),
        );
        assert_eq!(aggregated.rule, None);
        assert_eq!(
            aggregated.record,
            NutritionRecord::new(512.3, 20.1, 60.0, 19.0)
        );
    }

    #[test]
    fn empty_rule_table_only_normalizes() {
        let aggregated = Aggregator::without_rules().aggregate(
            NutritionRecord::new(5.04, -1.0, 0.0, 0.0),
            &AggregationContext::from_ingredients(&["2 apples".to_string()]),
        );
        assert_eq!(aggregated.record, NutritionRecord::new(5.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn sums_round_running_total() {
        let a = vec![nutrient("Calories", 52.04), nutrient("Protein", 0.26)];
        let b = vec![
            nutrient("calories", 52.04),
            nutrient("carbohydrates", 13.8),
            nutrient("fat", 0.17),
        ];
        let total = sum_nutrients([a.as_slice(), b.as_slice()]);
        assert_eq!(total, NutritionRecord::new(104.0, 0.3, 13.8, 0.2));
    }
}
