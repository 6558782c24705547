//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::Arc;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use platewise::providers::traits::{GenerativeModel, NutritionDatabase};
use platewise::telemetry;
use platewise::{
    FoodInput, ImageData, Nutrient, NutritionRecord, NutritionResolver, ParsedIngredient,
    Platewise, PlatewiseError, ResolverConfig, Result, SpoonacularClient, Tier,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Mock providers
// ============================================================================

struct FixedModel(&'static str);

#[async_trait]
impl GenerativeModel for FixedModel {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate(&self, _prompt: &str, _image: Option<&ImageData>) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Database whose searches fail and whose single ingredient is one apple.
struct AppleDatabase;

#[async_trait]
impl NutritionDatabase for AppleDatabase {
    fn name(&self) -> &str {
        "apple-db"
    }

    async fn search_product(&self, _query: &str) -> Result<Option<NutritionRecord>> {
        Err(PlatewiseError::Http("down".into()))
    }

    async fn search_recipe(&self, _query: &str) -> Result<Option<NutritionRecord>> {
        Ok(None)
    }

    async fn parse_ingredients(&self, _ingredients: &[String]) -> Result<Vec<ParsedIngredient>> {
        Ok(vec![ParsedIngredient {
            id: 9003,
            name: "apple".into(),
            amount: 1.0,
            unit: String::new(),
        }])
    }

    async fn ingredient_nutrients(&self, _ingredient: &ParsedIngredient) -> Result<Vec<Nutrient>> {
        Ok(vec![Nutrient {
            name: "Calories".into(),
            amount: 20.0,
            unit: "kcal".into(),
        }])
    }
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Counter value for a metric with a specific label value.
fn counter_with_label(snapshot: &SnapshotVec, name: &str, label: &str, value: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter
                && key.key().name() == name
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == label && l.value() == value)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

// ============================================================================
// Tests
// ============================================================================

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn http_request_records_metrics() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recipes/complexSearch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "results": [] })))
        .mount(&mock_server)
        .await;

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let result = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let client = SpoonacularClient::with_base_url("k", mock_server.uri())?;
                client.recipe_search("toast").await
            })
        })
    });
    assert!(result.is_ok());

    let snapshot = snapshotter.snapshot().into_vec();

    let count = counter_with_label(&snapshot, telemetry::REQUESTS_TOTAL, "status", "ok");
    assert_eq!(count, 1, "expected 1 ok request counter");

    assert!(
        has_histogram(&snapshot, telemetry::REQUEST_DURATION_SECONDS),
        "expected a duration histogram entry"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn tiers_and_floor_rules_record_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let result = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let resolver = NutritionResolver::new(
                    Arc::new(AppleDatabase),
                    Arc::new(FixedModel("unused")),
                );
                resolver.resolve(&["1 apple".to_string()], "an apple").await
            })
        })
    });
    let resolved = result.unwrap();
    assert_eq!(resolved.record.calories, 95.0);

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(
        counter_with_label(&snapshot, telemetry::TIER_MISSES_TOTAL, "tier", "product_search"),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::TIER_MISSES_TOTAL, "tier", "recipe_search"),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::TIER_HITS_TOTAL, "tier", "ingredient_sum"),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::FLOOR_RULES_TOTAL, "rule", "apple"),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn unresolved_analysis_is_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let result = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let analyzer = Platewise::builder()
                    .generative_model(Arc::new(FixedModel(
                        r#"{"description": "mystery stew", "ingredients": []}"#,
                    )))
                    .nutrition_database(Arc::new(AppleDatabase))
                    .resolver_config(ResolverConfig::new().tier(Tier::IngredientSum, false))
                    .build()?;
                analyzer.analyze(&FoodInput::text("stew")).await
            })
        })
    });
    let analysis = result.unwrap();
    assert!(!analysis.nutrition.is_resolved());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::UNRESOLVED_TOTAL), 1);
    assert_eq!(
        counter_with_label(&snapshot, telemetry::TIER_MISSES_TOTAL, "tier", "model_estimate"),
        1
    );
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let resolver = NutritionResolver::new(Arc::new(AppleDatabase), Arc::new(FixedModel("{}")));
    let _ = resolver.resolve(&["1 apple".to_string()], "apple").await;
}
