//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.platewise/config.toml` (user)
//! 3. `/etc/platewise/config.toml` (system)
//!
//! With no file at all, built-in defaults are used.
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.platewise/secrets.toml` (user, must be 0600)
//! 2. `/etc/platewise/secrets.toml` (system, must be 0600)
//!
//! Each key falls back to its environment variable (`GEMINI_API_KEY`,
//! `SPOONACULAR_API_KEY`).

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::aggregate::FloorRule;
use crate::cache::CacheConfig;
use crate::providers::RetryConfig;
use crate::resolve::ResolverConfig;
use crate::{PlatewiseError, Result};

/// Pipeline configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// HTTP request timeout in seconds (default: 30).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Bound on each identification model call in seconds (default: 60).
    #[serde(default)]
    pub identify_timeout_secs: Option<u64>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    /// Ingredient cache; absent means no cache.
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    #[serde(default)]
    pub aggregate: AggregateConfig,
}

/// Provider configurations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub spoonacular: SpoonacularConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiConfig {
    /// Model id (default: `gemini-2.0-flash`).
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpoonacularConfig {
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Floor rule table override. `None` keeps the built-in table; an empty
/// list disables floors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregateConfig {
    #[serde(default)]
    pub rules: Option<Vec<FloorRule>>,
}

/// Secrets configuration (API keys).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub gemini: Option<ApiKeySecret>,
    #[serde(default)]
    pub spoonacular: Option<ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

/// Provider name → environment variable name mapping.
const PROVIDER_ENV_VARS: &[(&str, &str)] = &[
    ("gemini", "GEMINI_API_KEY"),
    ("spoonacular", "SPOONACULAR_API_KEY"),
];

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path must exist. Without one, the first of
    /// `~/.platewise/config.toml` and `/etc/platewise/config.toml` is read,
    /// or defaults are returned when neither exists.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PlatewiseError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            PlatewiseError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(PlatewiseError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".platewise").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/platewise/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Returns empty secrets if no file exists (keys may come from env vars).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".platewise").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/platewise/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Read one secrets file after checking its permissions.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            PlatewiseError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            PlatewiseError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            PlatewiseError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(PlatewiseError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// API key for a provider, falling back to its environment variable.
    pub fn api_key(&self, provider: &str) -> Option<String> {
        let from_file = match provider {
            "gemini" => self.gemini.as_ref(),
            "spoonacular" => self.spoonacular.as_ref(),
            _ => None,
        }
        .map(|s| s.api_key.trim().to_string())
        .filter(|k| !k.is_empty());

        from_file.or_else(|| {
            PROVIDER_ENV_VARS
                .iter()
                .find(|(name, _)| *name == provider)
                .and_then(|(_, env_var)| std::env::var(env_var).ok())
                .filter(|k| !k.trim().is_empty())
        })
    }

    /// Like [`api_key`](Self::api_key) but a missing key is a configuration error.
    pub fn require_api_key(&self, provider: &str) -> Result<String> {
        self.api_key(provider).ok_or_else(|| {
            let hint = PROVIDER_ENV_VARS
                .iter()
                .find(|(name, _)| *name == provider)
                .map(|(_, var)| format!(" (set {var} or add [{provider}] api_key to secrets.toml)"))
                .unwrap_or_default();
            PlatewiseError::Configuration(format!("missing API key for {provider}{hint}"))
        })
    }
}

/// Whole seconds in TOML, [`Duration`](std::time::Duration) in Rust.
pub(crate) mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
