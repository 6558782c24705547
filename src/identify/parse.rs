//! Parsing of model responses into [`FoodIdentification`].

use serde_json::Value;

use crate::extract::extract_json_object;
use crate::types::FoodIdentification;
use crate::{PlatewiseError, Result};

/// Parse a response expected to contain a `{description, ingredients}` object.
pub fn parse_json(text: &str) -> Result<FoodIdentification> {
    let map = extract_json_object(text)
        .ok_or_else(|| PlatewiseError::Parse("no JSON object in model response".to_string()))?;

    let description = map
        .get("description")
        .and_then(Value::as_str)
        .map(clean_fragment)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| PlatewiseError::Parse("missing or empty \"description\"".to_string()))?;

    let ingredients: Vec<String> = map
        .get("ingredients")
        .and_then(Value::as_array)
        .ok_or_else(|| PlatewiseError::Parse("\"ingredients\" is not an array".to_string()))?
        .iter()
        .filter_map(Value::as_str)
        .map(clean_fragment)
        .filter(|i| !i.is_empty())
        .collect();

    Ok(finish(description, ingredients))
}

/// Parse a loosely formatted "description, then ingredient list" response.
///
/// Lines after an ingredients heading are entries (list markers stripped);
/// lines before it are joined into the description.
pub fn parse_listing(text: &str) -> Result<FoodIdentification> {
    let mut description_parts: Vec<String> = Vec::new();
    let mut ingredients: Vec<String> = Vec::new();
    let mut in_ingredients = false;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("```") {
            continue;
        }

        if let Some(rest) = ingredients_heading(line) {
            in_ingredients = true;
            ingredients.extend(
                rest.split(',')
                    .map(clean_fragment)
                    .filter(|i| !i.is_empty()),
            );
            continue;
        }

        let cleaned = clean_fragment(strip_list_marker(line));
        if cleaned.is_empty() {
            continue;
        }
        if in_ingredients {
            ingredients.push(cleaned);
        } else {
            description_parts.push(strip_label(&cleaned, "description").to_string());
        }
    }

    let mut description = description_parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if description.is_empty() {
        description = ingredients.join(", ");
    }
    if description.is_empty() {
        return Err(PlatewiseError::Parse(
            "model response contained no description or ingredients".to_string(),
        ));
    }

    Ok(finish(description, ingredients))
}

/// An empty ingredient list falls back to the description itself.
fn finish(description: String, mut ingredients: Vec<String>) -> FoodIdentification {
    if ingredients.is_empty() {
        ingredients.push(description.clone());
    }
    FoodIdentification {
        description,
        ingredients,
    }
}

/// If `line` is an ingredients heading, the text after it (possibly empty).
///
/// Matches `Ingredients:` anywhere in the line and numbered headings such as
/// `2. Ingredients` or `## Ingredients`.
fn ingredients_heading(line: &str) -> Option<&str> {
    let lower = line.to_lowercase();
    if let Some(pos) = lower.find("ingredients:") {
        // `to_lowercase` can change byte lengths for non-ASCII text.
        if lower.len() == line.len() {
            return Some(&line[pos + "ingredients:".len()..]);
        }
        return Some("");
    }

    let bare = clean_fragment(strip_list_marker(line)).to_lowercase();
    let bare = bare.trim_end_matches(':').trim();
    if bare == "ingredients" || (bare.starts_with("ingredients ") && bare.len() < 40) {
        return Some("");
    }
    None
}

/// Strip leading bullets (`-`, `•`, `*`, `+`) and numbering (`1.`, `2)`),
/// leaving quantities like `1.5 cups` intact.
fn strip_list_marker(line: &str) -> &str {
    let mut rest = line.trim_start();
    loop {
        if let Some(stripped) = rest
            .strip_prefix(['-', '•', '*', '+', '#'])
            .filter(|s| !s.starts_with('*') || rest.starts_with('#'))
        {
            rest = stripped.trim_start();
            continue;
        }

        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        if digits > 0 {
            let after = &rest[digits..];
            if let Some(tail) = after.strip_prefix(['.', ')']) {
                if tail.is_empty() || tail.starts_with(char::is_whitespace) {
                    rest = tail.trim_start();
                    continue;
                }
            }
        }
        return rest;
    }
}

/// Remove a leading `Label:` (case-insensitive).
fn strip_label<'a>(text: &'a str, label: &str) -> &'a str {
    match text.split_once(':') {
        Some((head, tail)) if head.trim().eq_ignore_ascii_case(label) => tail.trim(),
        _ => text,
    }
}

/// Trim and drop markdown emphasis.
fn clean_fragment(text: &str) -> String {
    text.replace("**", "").replace('`', "").trim().to_string()
}
