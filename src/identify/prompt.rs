//! Prompt templates for food identification.

const IMAGE_RULES: &str = r#"Provide a clear, concise description of just the food items, including:
- What the food or drink is
- Quantity or size if visible
- Key ingredients that are visible

DO NOT include:
- Cooking methods
- Preparation details
- Serving suggestions
- Appearance descriptions

List each distinct visible ingredient separately, even when it is part of the same dish, with a typical serving quantity where you can judge one.

Return ONLY a JSON object with two fields:
1. "description": brief description of the food (e.g. "Stack of cheese quesadillas", not "Quesadillas appear to be cooked on a griddle")
2. "ingredients": array of ingredient strings

Example responses:
{"description": "Stack of cheese quesadillas with jalapeños", "ingredients": ["2 tortillas", "1/2 cup shredded cheese", "1 tbsp jalapeños"]}
{"description": "Two chocolate chip cookies", "ingredients": ["2 chocolate chip cookies"]}
{"description": "Fresh mixed berry salad", "ingredients": ["1 cup strawberries", "1 cup blueberries", "1 cup raspberries"]}

The response must be ONLY the JSON object, with no additional text or formatting."#;

const TEXT_RULES: &str = r#"Format the response as follows:
1. First, a brief description of the food (what it is, not how it is cooked)
2. Then a line reading "Ingredients:" followed by one ingredient per line, each with an approximate quantity"#;

/// Vision prompt; `context` is the user's own description, if any.
pub fn image_prompt(context: Option<&str>) -> String {
    match context {
        Some(text) => format!(
            "Analyze this food/beverage image and this description: \"{}\".\n{IMAGE_RULES}",
            sanitize(text)
        ),
        None => format!("Analyze this food/beverage image.\n{IMAGE_RULES}"),
    }
}

/// Text-only prompt.
pub fn text_prompt(description: &str) -> String {
    format!(
        "Analyze this food description: \"{}\". List all ingredients with approximate quantities.\n{TEXT_RULES}",
        sanitize(description)
    )
}

/// Keep user text from closing the surrounding quotes.
fn sanitize(text: &str) -> String {
    text.trim().replace('"', "'")
}
