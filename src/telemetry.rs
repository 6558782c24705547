//! Telemetry metric name constants.
//!
//! Centralised metric names for platewise operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `platewise_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider`: provider name (e.g. "gemini", "spoonacular")
//! - `operation`: call made (e.g. "generate", "search_product")
//! - `status`: outcome: "ok" or "error"
//! - `tier`: resolution tier (e.g. "product_search", "model_estimate")
//! - `rule`: floor rule name (e.g. "apple", "dessert")

/// Total outbound provider requests.
///
/// Labels: `provider`, `operation`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "platewise_requests_total";

/// Outbound request duration in seconds.
///
/// Labels: `provider`, `operation`.
pub const REQUEST_DURATION_SECONDS: &str = "platewise_request_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `provider`, `operation`.
pub const RETRIES_TOTAL: &str = "platewise_retries_total";

/// Resolutions answered by a tier.
///
/// Labels: `tier`.
pub const TIER_HITS_TOTAL: &str = "platewise_tier_hits_total";

/// Tier attempts that produced no result and fell through.
///
/// Labels: `tier`.
pub const TIER_MISSES_TOTAL: &str = "platewise_tier_misses_total";

/// Floor rules that replaced a computed record.
///
/// Labels: `rule`.
pub const FLOOR_RULES_TOTAL: &str = "platewise_floor_rules_total";

/// Meal analyses where no tier produced nutrition data.
pub const UNRESOLVED_TOTAL: &str = "platewise_unresolved_total";

/// Ingredient nutrient cache hits.
pub const CACHE_HITS_TOTAL: &str = "platewise_cache_hits_total";

/// Ingredient nutrient cache misses.
pub const CACHE_MISSES_TOTAL: &str = "platewise_cache_misses_total";
