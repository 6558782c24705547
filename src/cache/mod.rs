//! Opt-in cache for per-ingredient nutrient lookups.
//!
//! Ingredient information is deterministic for a given (id, amount, unit),
//! and meals repeat ingredients constantly ("1 cup rice", "1 tbsp olive
//! oil"). [`IngredientCache`] sits in the resolver in front of
//! [`NutritionDatabase::ingredient_nutrients`](crate::providers::NutritionDatabase::ingredient_nutrients).
//! A hit bypasses retry logic and provider metrics entirely; hit/miss
//! metrics are emitted separately.
//!
//! Only successful lookups are stored. Failures are never cached, so a
//! transient outage does not pin a zero contribution.

use std::time::Duration;

use moka::future::Cache;
use serde::Deserialize;

use crate::telemetry;
use crate::types::{Nutrient, ParsedIngredient};

/// Configuration for the ingredient cache.
///
/// Pass to [`PlatewiseBuilder::ingredient_cache()`](crate::PlatewiseBuilder::ingredient_cache)
/// to activate. Without this, no cache is allocated.
///
/// ```rust
/// # use platewise::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(5_000)
///     .ttl(Duration::from_secs(6 * 3600));
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 10,000.
    pub max_entries: u64,
    /// Time-to-live for cached entries. Default: 24 hours.
    #[serde(rename = "ttl_secs", with = "crate::config::secs")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(24 * 3600),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Cache key: ingredient id, amount (exact bits) and lowercased unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct IngredientKey {
    id: i64,
    amount_bits: u64,
    unit: String,
}

impl IngredientKey {
    fn of(ingredient: &ParsedIngredient) -> Self {
        Self {
            id: ingredient.id,
            // Normalize -0.0 so it shares an entry with 0.0.
            amount_bits: (ingredient.amount + 0.0).to_bits(),
            unit: ingredient.query_unit().to_lowercase(),
        }
    }
}

/// In-memory LRU + TTL cache of ingredient nutrient lists.
pub struct IngredientCache {
    cache: Cache<IngredientKey, Vec<Nutrient>>,
}

impl IngredientCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Self { cache }
    }

    /// Look up nutrients for `ingredient`. Emits hit/miss metrics.
    pub async fn get(&self, ingredient: &ParsedIngredient) -> Option<Vec<Nutrient>> {
        match self.cache.get(&IngredientKey::of(ingredient)).await {
            Some(nutrients) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(nutrients)
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    pub async fn insert(&self, ingredient: &ParsedIngredient, nutrients: Vec<Nutrient>) {
        self.cache
            .insert(IngredientKey::of(ingredient), nutrients)
            .await;
    }

    /// Approximate number of entries (moka updates counts lazily).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}
