//! End-to-end MealAnalyzer tests with stub providers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use platewise::{
    Config, FoodIdentifier, FoodInput, GenerativeModel, ImageData, Nutrient, NutritionDatabase,
    NutritionOutcome, NutritionRecord, ParsedIngredient, Platewise, PlatewiseBuilder,
    PlatewiseError, Result, Secrets, Tier,
};

// ============================================================================
// Stubs
// ============================================================================

/// Model that replays scripted replies in order and records prompts.
struct ScriptedModel {
    replies: Mutex<Vec<Result<String>>>,
    prompts: Mutex<Vec<(String, bool)>>,
    calls: AtomicU32,
}

impl ScriptedModel {
    fn new(replies: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, image: Option<&ImageData>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), image.is_some()));
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(Err(PlatewiseError::EmptyResponse))
    }
}

/// Database with no data for anything.
#[derive(Default)]
struct EmptyDatabase {
    calls: AtomicU32,
}

#[async_trait]
impl NutritionDatabase for EmptyDatabase {
    fn name(&self) -> &str {
        "empty"
    }

    async fn search_product(&self, _query: &str) -> Result<Option<NutritionRecord>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn search_recipe(&self, _query: &str) -> Result<Option<NutritionRecord>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn parse_ingredients(&self, _ingredients: &[String]) -> Result<Vec<ParsedIngredient>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(Vec::new())
    }

    async fn ingredient_nutrients(&self, _ingredient: &ParsedIngredient) -> Result<Vec<Nutrient>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(Vec::new())
    }
}

const IDENTIFIED: &str = "```json\n{\"description\": \"Bowl of oatmeal with berries\", \"ingredients\": [\"1 cup oats\", \"1/2 cup blueberries\"]}\n```";
const ESTIMATE: &str = r#"{"calories": 310, "protein": 9, "carbs": 55, "fat": 5}"#;

fn analyzer(
    model: Arc<ScriptedModel>,
    database: Arc<EmptyDatabase>,
) -> platewise::MealAnalyzer {
    Platewise::builder()
        .generative_model(model)
        .nutrition_database(database)
        .build()
        .unwrap()
}

// ============================================================================
// Identification
// ============================================================================

#[tokio::test]
async fn empty_input_is_rejected_before_any_call() {
    let model = ScriptedModel::new(vec![]);
    let database = Arc::new(EmptyDatabase::default());
    let analyzer = analyzer(model.clone(), database.clone());

    for input in [FoodInput::default(), FoodInput::text("   ")] {
        let err = analyzer.analyze(&input).await.unwrap_err();
        assert!(matches!(err, PlatewiseError::InvalidInput(_)));
    }
    assert_eq!(model.calls(), 0);
    assert_eq!(database.calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn image_identification_parses_fenced_json() {
    let model = ScriptedModel::new(vec![Ok(IDENTIFIED.to_string())]);
    let identifier = FoodIdentifier::new(model.clone());

    let input = FoodInput::image(ImageData::from_bytes("image/jpeg", b"\xff\xd8\xff"))
        .with_text("breakfast");
    let identification = identifier.identify(&input).await.unwrap();
    assert_eq!(identification.description, "Bowl of oatmeal with berries");
    assert_eq!(identification.ingredients, vec!["1 cup oats", "1/2 cup blueberries"]);

    let prompts = model.prompts.lock().unwrap();
    assert!(prompts[0].1, "image must be sent");
    assert!(prompts[0].0.contains("breakfast"));
}

#[tokio::test]
async fn image_response_without_json_is_parse_error() {
    let model = ScriptedModel::new(vec![Ok("I see a tasty plate of food!".to_string())]);
    let identifier = FoodIdentifier::new(model);

    let input = FoodInput::image(ImageData::new("image/png", "AAAA"));
    let err = identifier.identify(&input).await.unwrap_err();
    assert!(matches!(err, PlatewiseError::Parse(_)));
}

#[tokio::test]
async fn text_identification_accepts_listing() {
    let reply = "A turkey sandwich on rye.\n\nIngredients:\n- 2 slices rye bread\n- 3 oz turkey\n- 1 leaf lettuce";
    let model = ScriptedModel::new(vec![Ok(reply.to_string())]);
    let identifier = FoodIdentifier::new(model.clone());

    let identification = identifier
        .identify(&FoodInput::text("turkey sandwich"))
        .await
        .unwrap();
    assert_eq!(identification.description, "A turkey sandwich on rye.");
    assert_eq!(identification.ingredients.len(), 3);
    assert!(!model.prompts.lock().unwrap()[0].1);
}

#[tokio::test]
async fn model_failure_during_identification_propagates() {
    let model = ScriptedModel::new(vec![Err(PlatewiseError::AuthenticationFailed)]);
    let analyzer = analyzer(model, Arc::new(EmptyDatabase::default()));

    let err = analyzer
        .analyze(&FoodInput::text("pizza"))
        .await
        .unwrap_err();
    assert!(matches!(err, PlatewiseError::AuthenticationFailed));
}

/// Model whose calls never complete.
struct HangingModel;

#[async_trait]
impl GenerativeModel for HangingModel {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn generate(&self, _prompt: &str, _image: Option<&ImageData>) -> Result<String> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn hung_model_times_out_identification() {
    let identifier = FoodIdentifier::new(Arc::new(HangingModel)).with_timeout(Duration::from_secs(5));

    let err = identifier
        .identify(&FoodInput::text("toast"))
        .await
        .unwrap_err();
    assert!(matches!(err, PlatewiseError::Timeout(_)), "got {err:?}");
}

#[tokio::test(start_paused = true)]
async fn analyzer_bounds_identification_by_default() {
    let analyzer = Platewise::builder()
        .generative_model(Arc::new(HangingModel))
        .nutrition_database(Arc::new(EmptyDatabase::default()))
        .build()
        .unwrap();

    let result = tokio::time::timeout(
        Duration::from_secs(3600),
        analyzer.analyze(&FoodInput::image(ImageData::new("image/jpeg", "AAAA"))),
    )
    .await
    .expect("identification must not hang");
    assert!(matches!(result, Err(PlatewiseError::Timeout(_))));
}

// ============================================================================
// Analysis
// ============================================================================

#[tokio::test]
async fn analysis_falls_back_to_model_estimate() {
    let model = ScriptedModel::new(vec![Ok(IDENTIFIED.to_string()), Ok(ESTIMATE.to_string())]);
    let analyzer = analyzer(model.clone(), Arc::new(EmptyDatabase::default()));

    let analysis = analyzer
        .analyze(&FoodInput::image(ImageData::new("image/jpeg", "AAAA")))
        .await
        .unwrap();
    match &analysis.nutrition {
        NutritionOutcome::Resolved(resolved) => {
            assert_eq!(resolved.tier, Tier::ModelEstimate);
            assert_eq!(resolved.record, NutritionRecord::new(310.0, 9.0, 55.0, 5.0));
        }
        other => panic!("expected resolved nutrition, got {other:?}"),
    }
    assert_eq!(model.calls(), 2);
    assert!(model.prompts.lock().unwrap()[1].0.contains("Bowl of oatmeal with berries"));
}

#[tokio::test]
async fn exhausted_resolution_is_unresolved_not_placeholder() {
    let model = ScriptedModel::new(vec![
        Ok(IDENTIFIED.to_string()),
        Ok("no idea, sorry".to_string()),
    ]);
    let analyzer = analyzer(model, Arc::new(EmptyDatabase::default()));

    let analysis = analyzer
        .analyze(&FoodInput::text("oatmeal"))
        .await
        .unwrap();
    assert!(!analysis.nutrition.is_resolved());
    assert!(analysis.nutrition.record().is_none());
    assert_eq!(
        analysis.nutrition.record_or_placeholder(),
        NutritionRecord::new(100.0, 2.0, 15.0, 5.0)
    );
    assert_eq!(analysis.identification.description, "Bowl of oatmeal with berries");

    let json = serde_json::to_value(&analysis).unwrap();
    assert_eq!(json["nutrition"]["status"], "unresolved");
}

// ============================================================================
// Builder
// ============================================================================

#[test]
fn build_without_collaborators_fails() {
    let err = Platewise::builder().build().err().expect("build must fail");
    assert!(matches!(err, PlatewiseError::Configuration(_)));

    let err = Platewise::builder()
        .gemini("key")
        .build()
        .err()
        .expect("missing database must fail");
    assert!(err.to_string().contains("nutrition database"));
}

#[test]
fn build_with_api_keys_succeeds() {
    assert!(
        Platewise::builder()
            .gemini("gemini-key")
            .spoonacular("spoonacular-key")
            .timeout_secs(5)
            .build()
            .is_ok()
    );
}

#[test]
fn from_config_requires_keys_present_in_secrets() {
    let secrets: Secrets = toml::from_str(
        r#"
        [gemini]
        api_key = "g"

        [spoonacular]
        api_key = "s"
    "#,
    )
    .unwrap();
    let config: Config = toml::from_str(
        r#"
        timeout_secs = 5
        [cache]
        max_entries = 10
    "#,
    )
    .unwrap();

    let builder = PlatewiseBuilder::from_config(&config, &secrets).unwrap();
    assert!(builder.build().is_ok());
}
