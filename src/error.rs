//! Platewise error types

use std::time::Duration;

/// Platewise error types
#[derive(Debug, thiserror::Error)]
pub enum PlatewiseError {
    // Caller errors
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    /// Daily request quota of the nutrition API is spent.
    #[error("API quota exceeded")]
    QuotaExceeded,

    /// An outbound call exceeded its time bound.
    #[error("request timed out: {0}")]
    Timeout(String),

    // Data errors
    /// Model output could not be turned into the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// The generative estimation tier produced no usable macro values.
    #[error("nutrition estimation failed: {0}")]
    Estimation(String),

    #[error("empty response from model")]
    EmptyResponse,

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl PlatewiseError {
    /// Whether a retry of the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PlatewiseError::Http(_)
            | PlatewiseError::Timeout(_)
            | PlatewiseError::RateLimited { .. } => true,
            PlatewiseError::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Provider-supplied backoff hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            PlatewiseError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PlatewiseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PlatewiseError::Timeout(err.to_string())
        } else if err.is_decode() {
            PlatewiseError::Parse(err.to_string())
        } else {
            PlatewiseError::Http(err.to_string())
        }
    }
}

/// Result type alias for Platewise operations
pub type Result<T> = std::result::Result<T, PlatewiseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = PlatewiseError::Upstream {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(err.is_transient());

        let err = PlatewiseError::Upstream {
            status: 404,
            message: "missing".into(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn retry_after_only_for_rate_limits() {
        let hint = Duration::from_secs(3);
        let err = PlatewiseError::RateLimited {
            retry_after: Some(hint),
        };
        assert_eq!(err.retry_after(), Some(hint));
        assert_eq!(PlatewiseError::AuthenticationFailed.retry_after(), None);
    }

    #[test]
    fn caller_errors_are_permanent() {
        assert!(!PlatewiseError::InvalidInput("nothing".into()).is_transient());
        assert!(!PlatewiseError::Parse("bad".into()).is_transient());
        assert!(!PlatewiseError::QuotaExceeded.is_transient());
    }

    #[test]
    fn timeouts_are_transient() {
        assert!(PlatewiseError::Timeout("model call exceeded 20s".into()).is_transient());
    }
}
