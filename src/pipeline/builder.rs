//! Builder for configuring [`MealAnalyzer`] instances

use std::sync::Arc;
use std::time::Duration;

use super::MealAnalyzer;
use crate::aggregate::{Aggregator, FloorRule};
use crate::cache::{CacheConfig, IngredientCache};
use crate::config::{Config, Secrets};
use crate::identify::FoodIdentifier;
use crate::providers::{
    DEFAULT_TIMEOUT, GeminiClient, GenerativeModel, NutritionDatabase, RetryConfig,
    RetryingGenerativeModel, RetryingNutritionDatabase, SpoonacularClient, gemini, spoonacular,
};
use crate::resolve::{NutritionResolver, ResolverConfig};
use crate::{PlatewiseError, Result};

/// Main entry point for creating analyzers.
pub struct Platewise;

impl Platewise {
    /// Create a new builder for configuring the analyzer.
    pub fn builder() -> PlatewiseBuilder {
        PlatewiseBuilder::new()
    }
}

/// Builder for [`MealAnalyzer`].
///
/// Each collaborator comes either from an API key (a real HTTP client is
/// built) or from an injected trait object; injection wins. Injected
/// collaborators are used as-is, without the retry decorator.
pub struct PlatewiseBuilder {
    gemini_key: Option<String>,
    gemini_base_url: Option<String>,
    gemini_model: Option<String>,
    gemini_temperature: Option<Option<f32>>,
    spoonacular_key: Option<String>,
    spoonacular_base_url: Option<String>,
    model: Option<Arc<dyn GenerativeModel>>,
    database: Option<Arc<dyn NutritionDatabase>>,
    default_timeout_secs: Option<u64>,
    identify_timeout: Option<Duration>,
    retry_config: RetryConfig,
    cache_config: Option<CacheConfig>,
    resolver_config: ResolverConfig,
    floor_rules: Option<Vec<FloorRule>>,
}

impl Default for PlatewiseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatewiseBuilder {
    pub fn new() -> Self {
        Self {
            gemini_key: None,
            gemini_base_url: None,
            gemini_model: None,
            gemini_temperature: None,
            spoonacular_key: None,
            spoonacular_base_url: None,
            model: None,
            database: None,
            default_timeout_secs: None,
            identify_timeout: None,
            retry_config: RetryConfig::default(),
            cache_config: None,
            resolver_config: ResolverConfig::default(),
            floor_rules: None,
        }
    }

    /// Seed a builder from loaded configuration and secrets.
    ///
    /// Fails when either API key is missing, so a misconfigured deployment
    /// stops at startup rather than on the first meal.
    pub fn from_config(config: &Config, secrets: &Secrets) -> Result<Self> {
        let gemini = &config.providers.gemini;
        let mut builder = Self::new()
            .gemini(secrets.require_api_key("gemini")?)
            .spoonacular(secrets.require_api_key("spoonacular")?)
            .retry(config.retry.clone())
            .resolver_config(config.resolver.clone());

        if let Some(url) = &gemini.base_url {
            builder = builder.gemini_base_url(url.clone());
        }
        if let Some(model) = &gemini.model {
            builder = builder.gemini_model(model.clone());
        }
        if gemini.temperature.is_some() {
            builder = builder.gemini_temperature(gemini.temperature);
        }
        if let Some(url) = &config.providers.spoonacular.base_url {
            builder = builder.spoonacular_base_url(url.clone());
        }
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout_secs(secs);
        }
        if let Some(secs) = config.identify_timeout_secs {
            builder = builder.identify_timeout(Duration::from_secs(secs));
        }
        if let Some(cache) = &config.cache {
            builder = builder.ingredient_cache(cache.clone());
        }
        if let Some(rules) = &config.aggregate.rules {
            builder = builder.floor_rules(rules.clone());
        }
        Ok(builder)
    }

    /// Configure the Gemini generative model.
    pub fn gemini(mut self, api_key: impl Into<String>) -> Self {
        self.gemini_key = Some(api_key.into());
        self
    }

    /// Override the Gemini API base URL.
    pub fn gemini_base_url(mut self, url: impl Into<String>) -> Self {
        self.gemini_base_url = Some(url.into());
        self
    }

    /// Override the Gemini model id.
    pub fn gemini_model(mut self, model: impl Into<String>) -> Self {
        self.gemini_model = Some(model.into());
        self
    }

    pub fn gemini_temperature(mut self, temperature: Option<f32>) -> Self {
        self.gemini_temperature = Some(temperature);
        self
    }

    /// Configure the Spoonacular nutrition database.
    pub fn spoonacular(mut self, api_key: impl Into<String>) -> Self {
        self.spoonacular_key = Some(api_key.into());
        self
    }

    /// Override the Spoonacular API base URL.
    pub fn spoonacular_base_url(mut self, url: impl Into<String>) -> Self {
        self.spoonacular_base_url = Some(url.into());
        self
    }

    /// Use a custom generative model implementation.
    pub fn generative_model(mut self, model: Arc<dyn GenerativeModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Use a custom nutrition database implementation.
    pub fn nutrition_database(mut self, database: Arc<dyn NutritionDatabase>) -> Self {
        self.database = Some(database);
        self
    }

    /// Set the HTTP request timeout for built clients (seconds).
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.default_timeout_secs = Some(secs);
        self
    }

    /// Bound on each identification model call (default: 60 s).
    ///
    /// Applies to injected models too, which carry no HTTP timeout.
    pub fn identify_timeout(mut self, timeout: Duration) -> Self {
        self.identify_timeout = Some(timeout);
        self
    }

    /// Retry policy for built clients.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Enable the ingredient nutrient cache.
    pub fn ingredient_cache(mut self, config: CacheConfig) -> Self {
        self.cache_config = Some(config);
        self
    }

    pub fn resolver_config(mut self, config: ResolverConfig) -> Self {
        self.resolver_config = config;
        self
    }

    /// Replace the floor rule table (an empty table disables floors).
    pub fn floor_rules(mut self, rules: Vec<FloorRule>) -> Self {
        self.floor_rules = Some(rules);
        self
    }

    /// Build the analyzer.
    pub fn build(self) -> Result<MealAnalyzer> {
        let timeout = self
            .default_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        let model: Arc<dyn GenerativeModel> = match (self.model, self.gemini_key) {
            (Some(model), _) => model,
            (None, Some(key)) => {
                let mut client = GeminiClient::with_options(
                    key,
                    self.gemini_base_url
                        .as_deref()
                        .unwrap_or(gemini::DEFAULT_BASE_URL),
                    timeout,
                )?;
                if let Some(model) = self.gemini_model {
                    client = client.model(model);
                }
                if let Some(temperature) = self.gemini_temperature {
                    client = client.temperature(temperature);
                }
                Arc::new(RetryingGenerativeModel::new(
                    Arc::new(client),
                    self.retry_config.clone(),
                ))
            }
            (None, None) => {
                return Err(PlatewiseError::Configuration(
                    "no generative model configured (use .gemini() or .generative_model())"
                        .to_string(),
                ));
            }
        };

        let database: Arc<dyn NutritionDatabase> = match (self.database, self.spoonacular_key) {
            (Some(database), _) => database,
            (None, Some(key)) => {
                let client = SpoonacularClient::with_options(
                    key,
                    self.spoonacular_base_url
                        .as_deref()
                        .unwrap_or(spoonacular::DEFAULT_BASE_URL),
                    timeout,
                )?;
                Arc::new(RetryingNutritionDatabase::new(
                    Arc::new(client),
                    self.retry_config,
                ))
            }
            (None, None) => {
                return Err(PlatewiseError::Configuration(
                    "no nutrition database configured (use .spoonacular() or .nutrition_database())"
                        .to_string(),
                ));
            }
        };

        let aggregator = self
            .floor_rules
            .map(Aggregator::new)
            .unwrap_or_default();

        let mut resolver = NutritionResolver::new(database, model.clone())
            .with_aggregator(aggregator)
            .with_config(self.resolver_config);
        if let Some(cache_config) = &self.cache_config {
            resolver = resolver.with_cache(IngredientCache::new(cache_config));
        }

        let mut identifier = FoodIdentifier::new(model);
        if let Some(timeout) = self.identify_timeout {
            identifier = identifier.with_timeout(timeout);
        }

        Ok(MealAnalyzer::new(identifier, resolver))
    }
}
