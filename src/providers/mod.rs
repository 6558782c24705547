//! Provider implementations for the generative model and nutrition database.
//!
//! [`GeminiClient`] and [`SpoonacularClient`] are thin typed HTTP clients.
//! The traits in [`traits`] are what the pipeline depends on; the retry
//! decorators in [`retry`] wrap any implementation.

pub mod gemini;
pub mod retry;
pub mod spoonacular;
pub mod traits;

use std::time::{Duration, Instant};

use reqwest::{Client, Response};

use crate::telemetry;
use crate::{PlatewiseError, Result};

pub use gemini::GeminiClient;
pub use retry::{RetryConfig, RetryingGenerativeModel, RetryingNutritionDatabase};
pub use spoonacular::SpoonacularClient;
pub use traits::{GenerativeModel, NutritionDatabase};

/// Default per-request HTTP timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest upstream error body carried into an error message.
const MAX_ERROR_BODY: usize = 200;

/// Build the shared HTTP client configuration used by all providers.
pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PlatewiseError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Check response status and map to the appropriate error.
///
/// Consumes the response on failure so the body can be quoted.
pub(crate) async fn check_status(response: Response, provider: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        401 | 403 => Err(PlatewiseError::AuthenticationFailed),
        402 => Err(PlatewiseError::QuotaExceeded),
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(PlatewiseError::RateLimited { retry_after })
        }
        code => {
            let body = response.text().await.unwrap_or_default();
            let mut message: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
            if message.is_empty() {
                message = format!("{provider} returned {status}");
            }
            Err(PlatewiseError::Upstream {
                status: code,
                message,
            })
        }
    }
}

/// Record request count and duration for one provider call.
pub(crate) fn record_request(provider: &str, operation: &'static str, start: Instant, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(telemetry::REQUESTS_TOTAL,
        "provider" => provider.to_owned(),
        "operation" => operation,
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
        "provider" => provider.to_owned(),
        "operation" => operation,
    )
    .record(start.elapsed().as_secs_f64());
}
