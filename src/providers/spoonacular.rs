//! Spoonacular client for product, recipe and ingredient nutrition.
//!
//! Every call authenticates with the `apiKey` query parameter.
//! See: <https://spoonacular.com/food-api/docs>

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::traits::NutritionDatabase;
use super::{DEFAULT_TIMEOUT, check_status, http_client, record_request};
use crate::Result;
use crate::types::{
    MACRO_NUTRIENTS, Nutrient, NutritionRecord, ParsedIngredient, lenient_optional_amount,
};

/// Default base URL for the Spoonacular API
pub const DEFAULT_BASE_URL: &str = "https://api.spoonacular.com";

const PROVIDER: &str = "spoonacular";

/// Nutrients requested for each ingredient.

/// Client for the Spoonacular food API.
#[derive(Clone)]
pub struct SpoonacularClient {
    api_key: String,
    http: Client,
    base_url: String,
}

impl SpoonacularClient {
    /// Create a new Spoonacular client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        Self::with_options(api_key, base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom base URL and request timeout.
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            http: http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Search packaged products; maps the first hit's nutrition block.
    #[instrument(skip(self))]
    pub async fn product_search(&self, query: &str) -> Result<Option<NutritionRecord>> {
        let start = Instant::now();
        let result = self
            .search::<ProductSearchResponse>("/food/products/search", query)
            .await
            .map(|body| {
                body.products
                    .into_iter()
                    .next()
                    .and_then(|p| p.nutrition)
                    .and_then(|n| n.to_record())
            });
        record_request(PROVIDER, "search_product", start, result.is_ok());
        result
    }

    /// Search recipes; extracts macros from the first hit's nutrient list.
    #[instrument(skip(self))]
    pub async fn recipe_search(&self, query: &str) -> Result<Option<NutritionRecord>> {
        let start = Instant::now();
        let result = self
            .search::<RecipeSearchResponse>("/recipes/complexSearch", query)
            .await
            .map(|body| {
                body.results
                    .into_iter()
                    .next()
                    .and_then(|r| r.nutrition)
                    .and_then(|n| NutritionRecord::try_from_nutrients(&n.nutrients))
            });
        record_request(PROVIDER, "search_recipe", start, result.is_ok());
        result
    }

    /// Parse free-text ingredient lines.
    #[instrument(skip(self, ingredients), fields(count = ingredients.len()))]
    pub async fn parse(&self, ingredients: &[String]) -> Result<Vec<ParsedIngredient>> {
        let start = Instant::now();
        let result = self.send_parse(ingredients).await;
        record_request(PROVIDER, "parse_ingredients", start, result.is_ok());
        result
    }

    /// Macro nutrients for one ingredient at its parsed amount.
    #[instrument(skip(self, ingredient), fields(id = ingredient.id, name = %ingredient.name))]
    pub async fn ingredient_information(&self, ingredient: &ParsedIngredient) -> Result<Vec<Nutrient>> {
        let start = Instant::now();
        let result = self.send_information(ingredient).await;
        record_request(PROVIDER, "ingredient_nutrients", start, result.is_ok());
        result
    }

    async fn search<T: DeserializeOwned>(&self, path: &str, query: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("query", query),
                ("addNutrition", "true"),
                ("number", "1"),
            ])
            .send()
            .await?;

        let response = check_status(response, PROVIDER).await?;
        Ok(response.json().await?)
    }

    async fn send_parse(&self, ingredients: &[String]) -> Result<Vec<ParsedIngredient>> {
        let url = format!("{}/recipes/parseIngredients", self.base_url);
        let list = ingredients.join("\n");

        let response = self
            .http
            .post(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .form(&[("ingredientList", list.as_str()), ("servings", "1")])
            .send()
            .await?;

        let response = check_status(response, PROVIDER).await?;
        let parsed: Vec<ParsedIngredient> = response.json().await?;
        debug!(parsed = parsed.len(), "parsed ingredients");
        Ok(parsed)
    }

    async fn send_information(&self, ingredient: &ParsedIngredient) -> Result<Vec<Nutrient>> {
        let url = format!(
            "{}/food/ingredients/{}/information",
            self.base_url, ingredient.id
        );
        let amount = ingredient.amount.to_string();

        let mut query: Vec<(&str, &str)> = vec![
            ("apiKey", self.api_key.as_str()),
            ("amount", amount.as_str()),
            ("unit", ingredient.query_unit()),
        ];
        query.extend(MACRO_NUTRIENTS.iter().map(|n| ("nutrient", *n)));

        let response = self.http.get(&url).query(&query).send().await?;
        let response = check_status(response, PROVIDER).await?;
        let body: IngredientInformation = response.json().await?;

        Ok(body
            .nutrition
            .map(|n| {
                n.nutrients
                    .into_iter()
                    .filter(|nutrient| {
                        MACRO_NUTRIENTS
                            .iter()
                            .any(|m| nutrient.name.eq_ignore_ascii_case(m))
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Deserialize)]
struct ProductSearchResponse {
    #[serde(default)]
    products: Vec<Product>,
}

#[derive(Deserialize)]
struct Product {
    nutrition: Option<ProductNutrition>,
}

/// Products carry headline values (`"protein": "5g"`) and sometimes a full
/// nutrient list; headline values win. A block with neither yields no record.
#[derive(Deserialize)]
struct ProductNutrition {
    #[serde(default, deserialize_with = "lenient_optional_amount")]
    calories: Option<f64>,
    #[serde(default, deserialize_with = "lenient_optional_amount")]
    protein: Option<f64>,
    #[serde(default, deserialize_with = "lenient_optional_amount")]
    carbs: Option<f64>,
    #[serde(default, deserialize_with = "lenient_optional_amount")]
    fat: Option<f64>,
    #[serde(default)]
    nutrients: Vec<Nutrient>,
}

impl ProductNutrition {
    fn to_record(&self) -> Option<NutritionRecord> {
        let headline = [self.calories, self.protein, self.carbs, self.fat];
        let listed = NutritionRecord::try_from_nutrients(&self.nutrients);
        if headline.iter().all(Option::is_none) && listed.is_none() {
            return None;
        }
        let listed = listed.unwrap_or_default();
        Some(NutritionRecord::new(
            self.calories.unwrap_or(listed.calories),
            self.protein.unwrap_or(listed.protein),
            self.carbs.unwrap_or(listed.carbs),
            self.fat.unwrap_or(listed.fat),
        ))
    }
}

#[derive(Deserialize)]
struct RecipeSearchResponse {
    #[serde(default)]
    results: Vec<Recipe>,
}

#[derive(Deserialize)]
struct Recipe {
    nutrition: Option<NutrientList>,
}

#[derive(Deserialize)]
struct NutrientList {
    #[serde(default)]
    nutrients: Vec<Nutrient>,
}

#[derive(Deserialize)]
struct IngredientInformation {
    nutrition: Option<NutrientList>,
}

// ============================================================================
// Provider Trait Implementation
// ============================================================================

#[async_trait]
impl NutritionDatabase for SpoonacularClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn search_product(&self, query: &str) -> Result<Option<NutritionRecord>> {
        self.product_search(query).await
    }

    async fn search_recipe(&self, query: &str) -> Result<Option<NutritionRecord>> {
        self.recipe_search(query).await
    }

    async fn parse_ingredients(&self, ingredients: &[String]) -> Result<Vec<ParsedIngredient>> {
        self.parse(ingredients).await
    }

    async fn ingredient_nutrients(&self, ingredient: &ParsedIngredient) -> Result<Vec<Nutrient>> {
        self.ingredient_information(ingredient).await
    }
}
