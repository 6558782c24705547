//! End-to-end meal analysis: identify, then resolve.

mod builder;

pub use builder::{Platewise, PlatewiseBuilder};

use tracing::{info, instrument, warn};

use crate::Result;
use crate::identify::FoodIdentifier;
use crate::resolve::NutritionResolver;
use crate::telemetry;
use crate::types::{FoodIdentification, FoodInput, MealAnalysis, NutritionOutcome, ResolvedNutrition};

/// Identifies a meal and resolves its nutrition.
///
/// Built with [`Platewise::builder()`]. Holds no per-call state; one
/// analyzer serves any number of concurrent calls.
pub struct MealAnalyzer {
    identifier: FoodIdentifier,
    resolver: NutritionResolver,
}

impl MealAnalyzer {
    pub fn new(identifier: FoodIdentifier, resolver: NutritionResolver) -> Self {
        Self {
            identifier,
            resolver,
        }
    }

    /// Run identification then resolution.
    ///
    /// Identification errors propagate. Resolution exhaustion does not: it
    /// yields `NutritionOutcome::Unresolved` alongside the identification.
    #[instrument(skip_all)]
    pub async fn analyze(&self, input: &FoodInput) -> Result<MealAnalysis> {
        let identification = self.identifier.identify(input).await?;

        let nutrition = match self
            .resolver
            .resolve(&identification.ingredients, &identification.description)
            .await
        {
            Ok(resolved) => {
                info!(
                    tier = %resolved.tier,
                    calories = resolved.record.calories,
                    floor_rule = resolved.floor_rule.as_deref(),
                    "meal analyzed"
                );
                NutritionOutcome::Resolved(resolved)
            }
            Err(e) => {
                metrics::counter!(telemetry::UNRESOLVED_TOTAL).increment(1);
                warn!(error = %e, description = %identification.description, "nutrition unresolved");
                NutritionOutcome::Unresolved {
                    reason: e.to_string(),
                }
            }
        };

        Ok(MealAnalysis {
            identification,
            nutrition,
        })
    }

    /// Identification only.
    pub async fn identify(&self, input: &FoodInput) -> Result<FoodIdentification> {
        self.identifier.identify(input).await
    }

    /// Resolution only; errors are returned as-is.
    pub async fn resolve(
        &self,
        ingredients: &[String],
        description: &str,
    ) -> Result<ResolvedNutrition> {
        self.resolver.resolve(ingredients, description).await
    }
}
