//! Retry configuration, delay calculation, and provider decorators.
//!
//! Provides [`RetryConfig`] for controlling retry behaviour and
//! `Retrying*` decorators that wrap the provider traits with automatic
//! retry on transient errors.
//!
//! All decorators delegate to the shared `with_retry()` helper,
//! keeping retry logic in a single place.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tracing::warn;

use super::traits::{GenerativeModel, NutritionDatabase};
use crate::telemetry;
use crate::types::{ImageData, Nutrient, NutritionRecord, ParsedIngredient};
use crate::{PlatewiseError, Result};

/// Configuration for retry behaviour on transient errors.
///
/// Uses exponential backoff with optional jitter:
///
/// ```rust
/// # use platewise::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(4)
///     .initial_delay(Duration::from_millis(200))
///     .jitter(false);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 2.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 500ms.
    #[serde(with = "millis")]
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 5s.
    #[serde(with = "millis")]
    pub max_delay: Duration,
    /// Whether to add up to 25% random jitter to delays. Default: true.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter.
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Delay for a given attempt number (0-indexed), without jitter.
    ///
    /// `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }

    /// Effective delay, respecting provider `retry_after` hints.
    ///
    /// A `retry_after` hint takes precedence over the calculated backoff
    /// and is never jittered.
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(hint) = retry_after {
            return hint;
        }
        let base = self.delay_for_attempt(attempt);
        if self.jitter {
            base + base.mul_f64(rand::thread_rng().gen_range(0.0..0.25))
        } else {
            base
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

// ============================================================================
// Shared retry helper
// ============================================================================

/// Execute an async operation with retry logic.
///
/// Retries on transient errors (as classified by [`PlatewiseError::is_transient()`])
/// up to `config.max_attempts`, using exponential backoff and respecting
/// `retry_after` hints from `RateLimited` errors.
///
/// Permanent errors are returned immediately without retry.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    provider_name: &str,
    operation: &str,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..config.max_attempts.max(1) {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() => {
                if attempt + 1 < config.max_attempts {
                    metrics::counter!(telemetry::RETRIES_TOTAL,
                        "provider" => provider_name.to_owned(),
                        "operation" => operation.to_owned(),
                    )
                    .increment(1);
                    let delay = config.effective_delay(attempt, e.retry_after());
                    warn!(
                        provider = provider_name,
                        operation,
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e), // permanent error, no retry
        }
    }
    Err(last_err.unwrap_or_else(|| {
        PlatewiseError::Configuration("retry loop ran zero attempts".to_string())
    }))
}

// ============================================================================
// RetryingGenerativeModel
// ============================================================================

/// Decorator that wraps a [`GenerativeModel`] with retry logic.
///
/// On transient errors, retries with exponential backoff up to
/// `config.max_attempts`. Permanent errors are returned immediately.
pub struct RetryingGenerativeModel {
    inner: Arc<dyn GenerativeModel>,
    config: RetryConfig,
}

impl RetryingGenerativeModel {
    /// Wrap a generative model with retry logic.
    pub fn new(inner: Arc<dyn GenerativeModel>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl GenerativeModel for RetryingGenerativeModel {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, prompt: &str, image: Option<&ImageData>) -> Result<String> {
        with_retry(&self.config, self.inner.name(), "generate", || {
            self.inner.generate(prompt, image)
        })
        .await
    }
}

// ============================================================================
// RetryingNutritionDatabase
// ============================================================================

/// Decorator that wraps a [`NutritionDatabase`] with retry logic.
///
/// Same semantics as [`RetryingGenerativeModel`].
pub struct RetryingNutritionDatabase {
    inner: Arc<dyn NutritionDatabase>,
    config: RetryConfig,
}

impl RetryingNutritionDatabase {
    /// Wrap a nutrition database with retry logic.
    pub fn new(inner: Arc<dyn NutritionDatabase>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl NutritionDatabase for RetryingNutritionDatabase {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn search_product(&self, query: &str) -> Result<Option<NutritionRecord>> {
        with_retry(&self.config, self.inner.name(), "search_product", || {
            self.inner.search_product(query)
        })
        .await
    }

    async fn search_recipe(&self, query: &str) -> Result<Option<NutritionRecord>> {
        with_retry(&self.config, self.inner.name(), "search_recipe", || {
            self.inner.search_recipe(query)
        })
        .await
    }

    async fn parse_ingredients(&self, ingredients: &[String]) -> Result<Vec<ParsedIngredient>> {
        with_retry(&self.config, self.inner.name(), "parse_ingredients", || {
            self.inner.parse_ingredients(ingredients)
        })
        .await
    }

    async fn ingredient_nutrients(&self, ingredient: &ParsedIngredient) -> Result<Vec<Nutrient>> {
        with_retry(&self.config, self.inner.name(), "ingredient_nutrients", || {
            self.inner.ingredient_nutrients(ingredient)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let config = RetryConfig::new()
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(350))
            .jitter(false);
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(350));
    }

    #[test]
    fn retry_after_hint_wins() {
        let config = RetryConfig::new();
        let hint = Duration::from_secs(7);
        assert_eq!(config.effective_delay(0, Some(hint)), hint);
    }

    #[test]
    fn jitter_stays_within_quarter() {
        let config = RetryConfig::new().initial_delay(Duration::from_millis(400));
        let delay = config.effective_delay(0, None);
        assert!(delay >= Duration::from_millis(400));
        assert!(delay < Duration::from_millis(500));
    }

    #[test]
    fn jitter_varies_between_calls() {
        let config = RetryConfig::new().initial_delay(Duration::from_secs(1));
        let first = config.effective_delay(0, None);
        let varied = (0..64).any(|_| config.effective_delay(0, None) != first);
        assert!(varied, "jittered delays should not all be identical");
    }

    #[test]
    fn deserializes_millis_from_toml() {
        let config: RetryConfig = toml::from_str(
            r#"
            max_attempts = 4
            initial_delay = 250
        "#,
        )
        .unwrap();
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.initial_delay, Duration::from_millis(250));
        assert_eq!(config.max_delay, Duration::from_secs(5));
    }
}
