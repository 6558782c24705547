//! Tiered nutrition resolution.
//!
//! [`NutritionResolver::resolve`] tries, in order:
//!
//! 1. packaged-product search on the description
//! 2. recipe search on the description
//! 3. per-ingredient lookup and sum (through the [`Aggregator`])
//! 4. a generative model estimate
//!
//! The first tier that yields a record wins. Failures in tiers 1-3
//! (transport, status, decoding, timeout or simply no match) are logged
//! and fall through. Tier 4 is terminal: if it cannot produce all four
//! macros the call fails with `Estimation`.

pub mod estimate;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::aggregate::{AggregationContext, Aggregated, Aggregator, sum_nutrients};
use crate::cache::IngredientCache;
use crate::providers::{GenerativeModel, NutritionDatabase};
use crate::telemetry;
use crate::types::{Nutrient, NutritionRecord, ParsedIngredient, ResolvedNutrition, Tier};
use crate::{PlatewiseError, Result};

/// Tuning for [`NutritionResolver`].
///
/// ```toml
/// [resolver]
/// call_timeout_secs = 20
/// recipe_search = false
/// denylist = ["flowers", "garnish"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Upper bound on each tier call. Default: 20s.
    #[serde(rename = "call_timeout_secs", with = "crate::config::secs")]
    pub call_timeout: Duration,
    pub product_search: bool,
    pub recipe_search: bool,
    pub ingredient_sum: bool,
    pub model_estimate: bool,
    /// Parsed ingredient names (case-insensitive) excluded from sums.
    pub denylist: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(20),
            product_search: true,
            recipe_search: true,
            ingredient_sum: true,
            model_estimate: true,
            denylist: vec!["flowers".to_string()],
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Enable or disable a single tier.
    pub fn tier(mut self, tier: Tier, enabled: bool) -> Self {
        match tier {
            Tier::ProductSearch => self.product_search = enabled,
            Tier::RecipeSearch => self.recipe_search = enabled,
            Tier::IngredientSum => self.ingredient_sum = enabled,
            Tier::ModelEstimate => self.model_estimate = enabled,
        }
        self
    }

    pub fn denylist(mut self, names: Vec<String>) -> Self {
        self.denylist = names;
        self
    }

    fn enabled(&self, tier: Tier) -> bool {
        match tier {
            Tier::ProductSearch => self.product_search,
            Tier::RecipeSearch => self.recipe_search,
            Tier::IngredientSum => self.ingredient_sum,
            Tier::ModelEstimate => self.model_estimate,
        }
    }

    fn is_denied(&self, name: &str) -> bool {
        let name = name.trim();
        self.denylist.iter().any(|d| d.trim().eq_ignore_ascii_case(name))
    }
}

/// Resolves a meal to a [`ResolvedNutrition`] through the tier chain.
pub struct NutritionResolver {
    database: Arc<dyn NutritionDatabase>,
    model: Arc<dyn GenerativeModel>,
    aggregator: Aggregator,
    cache: Option<IngredientCache>,
    config: ResolverConfig,
}

impl NutritionResolver {
    /// Resolver with the default floor rules, no cache and default config.
    pub fn new(database: Arc<dyn NutritionDatabase>, model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            database,
            model,
            aggregator: Aggregator::default(),
            cache: None,
            config: ResolverConfig::default(),
        }
    }

    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn with_cache(mut self, cache: IngredientCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Resolve nutrition for a meal.
    ///
    /// `ingredients` feeds tier 3; `description` feeds tiers 1, 2 and 4.
    /// A blank description skips the tiers that need it. Fails with
    /// `Estimation` only after every enabled tier came up empty.
    #[instrument(skip_all, fields(ingredients = ingredients.len()))]
    pub async fn resolve(
        &self,
        ingredients: &[String],
        description: &str,
    ) -> Result<ResolvedNutrition> {
        let description = description.trim();

        if !description.is_empty() {
            if let Some(record) = self
                .attempt(Tier::ProductSearch, self.database.search_product(description))
                .await
            {
                return Ok(resolved(Tier::ProductSearch, record.rounded(), None));
            }
            if let Some(record) = self
                .attempt(Tier::RecipeSearch, self.database.search_recipe(description))
                .await
            {
                return Ok(resolved(Tier::RecipeSearch, record.rounded(), None));
            }
        }

        if !ingredients.is_empty() {
            if let Some(Aggregated { record, rule }) = self
                .attempt(Tier::IngredientSum, self.sum_ingredients(ingredients))
                .await
            {
                return Ok(resolved(Tier::IngredientSum, record, rule));
            }
        }

        self.estimate(description).await
    }

    /// Run one fallible tier, turning every failure into "no result".
    async fn attempt<T, F>(&self, tier: Tier, call: F) -> Option<T>
    where
        F: Future<Output = Result<Option<T>>>,
    {
        if !self.config.enabled(tier) {
            debug!(tier = %tier, "tier disabled");
            return None;
        }

        let outcome = match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(Ok(Some(value))) => Some(value),
            Ok(Ok(None)) => {
                debug!(tier = %tier, "tier returned no result");
                None
            }
            Ok(Err(e)) => {
                warn!(tier = %tier, error = %e, "tier failed, trying next");
                None
            }
            Err(_) => {
                warn!(
                    tier = %tier,
                    timeout_ms = self.config.call_timeout.as_millis() as u64,
                    "tier timed out, trying next"
                );
                None
            }
        };

        let name = if outcome.is_some() {
            telemetry::TIER_HITS_TOTAL
        } else {
            telemetry::TIER_MISSES_TOTAL
        };
        metrics::counter!(name, "tier" => tier.as_str()).increment(1);
        outcome
    }

    /// Tier 3: parse, filter, fetch concurrently, sum, aggregate.
    async fn sum_ingredients(&self, ingredients: &[String]) -> Result<Option<Aggregated>> {
        let parsed = self.database.parse_ingredients(ingredients).await?;
        let usable: Vec<ParsedIngredient> = parsed
            .into_iter()
            .filter(|p| p.is_resolved() && !self.config.is_denied(&p.name))
            .collect();
        if usable.is_empty() {
            debug!("no parsed ingredient matched the database");
            return Ok(None);
        }

        let results = join_all(usable.iter().map(|i| self.ingredient_nutrients(i))).await;
        let lists: Vec<Vec<Nutrient>> = results
            .into_iter()
            .zip(&usable)
            .filter_map(|(result, ingredient)| {
                result
                    .inspect_err(|e| {
                        warn!(
                            ingredient = %ingredient.name,
                            id = ingredient.id,
                            error = %e,
                            "ingredient lookup failed, counting as zero"
                        );
                    })
                    .ok()
            })
            .collect();
        if lists.is_empty() {
            warn!(count = usable.len(), "every ingredient lookup failed");
            return Ok(None);
        }

        let partial = sum_nutrients(lists.iter().map(Vec::as_slice));
        Ok(Some(self.aggregator.aggregate(
            partial,
            &AggregationContext::from_ingredients(ingredients),
        )))
    }

    async fn ingredient_nutrients(&self, ingredient: &ParsedIngredient) -> Result<Vec<Nutrient>> {
        if let Some(cache) = &self.cache {
            if let Some(nutrients) = cache.get(ingredient).await {
                return Ok(nutrients);
            }
        }
        let nutrients = self.database.ingredient_nutrients(ingredient).await?;
        if let Some(cache) = &self.cache {
            cache.insert(ingredient, nutrients.clone()).await;
        }
        Ok(nutrients)
    }

    /// Tier 4. Terminal: every failure is an `Estimation` error.
    async fn estimate(&self, description: &str) -> Result<ResolvedNutrition> {
        let tier = Tier::ModelEstimate;
        let result = if !self.config.enabled(tier) {
            Err(PlatewiseError::Estimation("model estimate disabled".to_string()))
        } else if description.is_empty() {
            Err(PlatewiseError::Estimation(
                "no description to estimate from".to_string(),
            ))
        } else {
            let prompt = estimate::estimate_prompt(description);
            match tokio::time::timeout(self.config.call_timeout, self.model.generate(&prompt, None))
                .await
            {
                Ok(Ok(text)) => estimate::parse_estimate(&text),
                Ok(Err(e)) => Err(PlatewiseError::Estimation(e.to_string())),
                Err(_) => Err(PlatewiseError::Estimation(format!(
                    "model did not answer within {:?}",
                    self.config.call_timeout
                ))),
            }
        };

        match result {
            Ok(record) => {
                metrics::counter!(telemetry::TIER_HITS_TOTAL, "tier" => tier.as_str())
                    .increment(1);
                info!(calories = record.calories, "nutrition estimated by model");
                Ok(resolved(tier, record, None))
            }
            Err(e) => {
                metrics::counter!(telemetry::TIER_MISSES_TOTAL, "tier" => tier.as_str())
                    .increment(1);
                warn!(error = %e, "all nutrition tiers failed");
                Err(e)
            }
        }
    }
}

fn resolved(tier: Tier, record: NutritionRecord, floor_rule: Option<String>) -> ResolvedNutrition {
    debug!(tier = %tier, %record, "nutrition resolved");
    ResolvedNutrition {
        record,
        tier,
        floor_rule,
    }
}
