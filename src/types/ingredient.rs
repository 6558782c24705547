//! Nutrition database record types

use serde::{Deserialize, Deserializer, Serialize};

/// An ingredient string resolved by the natural-language parser.
///
/// `id <= 0` means the parser could not match a known food.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIngredient {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: f64,
    #[serde(default)]
    pub unit: String,
}

impl ParsedIngredient {
    /// Whether this ingredient has a database match.
    pub fn is_resolved(&self) -> bool {
        self.id > 0
    }

    /// Unit to query with; blank units fall back to one serving.
    pub fn query_unit(&self) -> &str {
        let unit = self.unit.trim();
        if unit.is_empty() { "serving" } else { unit }
    }
}

/// One named nutrient amount, e.g. `{"name": "Protein", "amount": 3.2, "unit": "g"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nutrient {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: f64,
    #[serde(default)]
    pub unit: String,
}

/// Nutrient names for the four macros, as the nutrition API spells them.
pub(crate) const MACRO_NUTRIENTS: [&str; 4] = ["calories", "protein", "carbohydrates", "fat"];

/// Find a nutrient amount by case-insensitive name.
pub fn find_nutrient(nutrients: &[Nutrient], name: &str) -> Option<f64> {
    nutrients
        .iter()
        .find(|n| n.name.eq_ignore_ascii_case(name))
        .map(|n| n.amount)
}

/// Find a nutrient amount by case-insensitive name, zero when absent.
pub fn nutrient_amount(nutrients: &[Nutrient], name: &str) -> f64 {
    find_nutrient(nutrients, name).unwrap_or(0.0)
}

/// Accept `12.5`, `"12.5"`, `"12.5g"` or `null` as an amount.
pub(crate) fn lenient_amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(amount_from_value).unwrap_or(0.0))
}

/// Same as [`lenient_amount`] but keeps absence distinguishable.
pub(crate) fn lenient_optional_amount<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(amount_from_value))
}

/// Numeric value of a JSON number or a string with an optional unit suffix.
pub(crate) fn amount_from_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            let s = s.trim();
            let end = s
                .char_indices()
                .find(|(_, c)| !(c.is_ascii_digit() || matches!(c, '.' | '-' | ',')))
                .map(|(i, _)| i)
                .unwrap_or(s.len());
            strip_thousands(&s[..end])?.parse::<f64>().ok()
        }
        _ => None,
    }
}

/// Remove `,` thousands separators. Any comma not followed by exactly three
/// digits (e.g. a decimal comma in `"1,5"`) makes the number ambiguous.
fn strip_thousands(number: &str) -> Option<String> {
    let mut groups = number.split(',');
    let head = groups.next().unwrap_or_default();
    let mut digits = head.to_string();
    for group in groups {
        let whole = group.split('.').next().unwrap_or_default();
        if head.is_empty() || whole.len() != 3 || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.push_str(group);
    }
    Some(digits)
}
