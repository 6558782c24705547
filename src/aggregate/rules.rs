//! Floor rules: named corrections for implausibly low ingredient sums.
//!
//! Per-ingredient lookups under-count when the database lacks density or
//! serving data for a matched name. Each rule pairs a predicate over the
//! computed total with a replacement record. Rules are evaluated in table
//! order and the first match wins.
//!
//! The table deserializes from TOML:
//!
//! ```toml
//! [[aggregate.rules]]
//! name = "apple"
//! kind = "per_unit"
//! keyword = "apple"
//! per_unit = { calories = 95.0, protein = 0.5, carbs = 25.0, fat = 0.3 }
//! ```

use serde::{Deserialize, Serialize};

use crate::types::NutritionRecord;

/// One named floor rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorRule {
    pub name: String,
    #[serde(flatten)]
    pub kind: FloorKind,
}

/// Predicate + replacement for a [`FloorRule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FloorKind {
    /// A countable food named in the description (word-prefix match, so
    /// "apples" matches `apple` but "pineapple" does not). Fires when
    /// calories < `per_unit.calories × count`; yields `per_unit × count`.
    PerUnit {
        keyword: String,
        per_unit: NutritionRecord,
    },
    /// Any ingredient contains one of `keywords` (substring match) and
    /// calories < `below_calories`; yields `replacement`.
    Keyword {
        keywords: Vec<String>,
        below_calories: f64,
        replacement: NutritionRecord,
    },
    /// At least one ingredient and calories < `per_unit_threshold × count`;
    /// yields `per_unit × count`.
    Minimum {
        per_unit_threshold: f64,
        per_unit: NutritionRecord,
    },
}

/// Normalized view of the meal a rule is evaluated against.
#[derive(Debug, Clone)]
pub struct RuleInput {
    /// Lowercased description text.
    pub description: String,
    /// Lowercased ingredient strings.
    pub ingredients: Vec<String>,
    /// Detected unit count (≥ 1).
    pub count: f64,
}

impl FloorRule {
    pub fn new(name: impl Into<String>, kind: FloorKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Replacement record if this rule fires for `total`.
    pub fn apply(&self, total: &NutritionRecord, input: &RuleInput) -> Option<NutritionRecord> {
        match &self.kind {
            FloorKind::PerUnit { keyword, per_unit } => {
                let floor = per_unit.scaled(input.count);
                (contains_word_prefix(&input.description, &keyword.to_lowercase())
                    && total.calories < floor.calories)
                    .then_some(floor)
            }
            FloorKind::Keyword {
                keywords,
                below_calories,
                replacement,
            } => {
                let hit = |text: &String| keywords.iter().any(|k| text.contains(&k.to_lowercase()));
                let matched = if input.ingredients.is_empty() {
                    hit(&input.description)
                } else {
                    input.ingredients.iter().any(hit)
                };
                (matched && total.calories < *below_calories).then_some(*replacement)
            }
            FloorKind::Minimum {
                per_unit_threshold,
                per_unit,
            } => (!input.ingredients.is_empty()
                && total.calories < per_unit_threshold * input.count)
                .then(|| per_unit.scaled(input.count)),
        }
    }
}

/// The standard rule table.
pub fn default_rules() -> Vec<FloorRule> {
    vec![
        FloorRule::new(
            "apple",
            FloorKind::PerUnit {
                keyword: "apple".to_string(),
                per_unit: NutritionRecord::new(95.0, 0.5, 25.0, 0.3),
            },
        ),
        FloorRule::new(
            "banana",
            FloorKind::PerUnit {
                keyword: "banana".to_string(),
                per_unit: NutritionRecord::new(105.0, 1.3, 27.0, 0.4),
            },
        ),
        FloorRule::new(
            "orange",
            FloorKind::PerUnit {
                keyword: "orange".to_string(),
                per_unit: NutritionRecord::new(62.0, 1.2, 15.4, 0.2),
            },
        ),
        FloorRule::new(
            "dessert",
            FloorKind::Keyword {
                keywords: ["cake", "cookie", "dessert", "cream"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                below_calories: 200.0,
                replacement: NutritionRecord::new(350.0, 5.0, 45.0, 18.0),
            },
        ),
        FloorRule::new(
            "minimum",
            FloorKind::Minimum {
                per_unit_threshold: 50.0,
                per_unit: NutritionRecord::new(100.0, 2.0, 15.0, 5.0),
            },
        ),
    ]
}

/// `needle` occurs in `haystack` at the start of a word.
fn contains_word_prefix(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(pos, _)| {
        haystack[..pos]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric())
    })
}
