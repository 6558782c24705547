//! Pull structured JSON out of free-form model output.
//!
//! Models wrap JSON in markdown fences, prepend prose, or use typographic
//! quotes. [`extract_json_object`] finds the first `{...}` span that parses
//! as a JSON object.

use serde_json::{Map, Value};

/// First well-formed JSON object embedded in `text`.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let normalized = normalize_quotes(text);
    let text = normalized.as_str();

    for (start, _) in text.match_indices('{') {
        if let Some(end) = matching_brace(&text[start..]) {
            if let Ok(Value::Object(map)) = serde_json::from_str(&text[start..start + end + 1]) {
                return Some(map);
            }
        }
    }

    // Unbalanced braces inside strings defeat the scanner; fall back to the
    // widest span.
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Byte offset of the `}` closing the `{` at offset 0, skipping string contents.
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn normalize_quotes(text: &str) -> String {
    text.replace(['\u{201C}', '\u{201D}'], "\"")
}
