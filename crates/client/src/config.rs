//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `BAZAAR_CATALOG_URL` - Product catalog base URL (default: <https://dummyjson.com>)
//! - `BAZAAR_STATE_PATH` - Local session state file (default: `.bazaar/state.json`)
//! - `BAZAAR_WISHLIST_CONCURRENCY` - Parallel lookups when listing a wishlist (default: 4)
//! - `FIREBASE_API_KEY` - Web API key; enables sign-in, sign-up and the wishlist
//! - `FIREBASE_PROJECT_ID` - Firestore project (required when `FIREBASE_API_KEY` is set)
//! - `FIREBASE_AUTH_EMULATOR_HOST` - Route auth calls to a local emulator (e.g. `127.0.0.1:9099`)
//! - `FIRESTORE_EMULATOR_HOST` - Route document calls to a local emulator (e.g. `127.0.0.1:8080`)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_CATALOG_URL: &str = "https://dummyjson.com";
const DEFAULT_STATE_PATH: &str = ".bazaar/state.json";
const DEFAULT_WISHLIST_CONCURRENCY: &str = "4";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "insert",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the product catalog endpoint
    pub catalog_url: Url,
    /// Firebase configuration, absent when no API key is configured
    pub firebase: Option<FirebaseConfig>,
    /// File backing the local session state
    pub state_path: PathBuf,
    /// Upper bound on concurrent product lookups in `WishlistSync::list`
    pub wishlist_concurrency: usize,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Firebase (Identity Toolkit + Firestore) configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct FirebaseConfig {
    /// Web API key
    pub api_key: SecretString,
    /// Firestore project ID
    pub project_id: String,
    /// Auth emulator `host:port`
    pub auth_emulator_host: Option<String>,
    /// Firestore emulator `host:port`
    pub firestore_emulator_host: Option<String>,
}

impl std::fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("api_key", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("auth_emulator_host", &self.auth_emulator_host)
            .field("firestore_emulator_host", &self.firestore_emulator_host)
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid, if `FIREBASE_API_KEY`
    /// is set without `FIREBASE_PROJECT_ID`, or if the API key looks like a
    /// placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let catalog_url = parse_http_url(
            "BAZAAR_CATALOG_URL",
            &env.get_or_default("BAZAAR_CATALOG_URL", DEFAULT_CATALOG_URL),
        )?;
        let state_path = PathBuf::from(env.get_or_default("BAZAAR_STATE_PATH", DEFAULT_STATE_PATH));
        let wishlist_concurrency = env
            .get_or_default("BAZAAR_WISHLIST_CONCURRENCY", DEFAULT_WISHLIST_CONCURRENCY)
            .parse::<usize>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("BAZAAR_WISHLIST_CONCURRENCY".to_string(), e.to_string())
            })?;
        if wishlist_concurrency == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BAZAAR_WISHLIST_CONCURRENCY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let firebase = FirebaseConfig::from_env(&env)?;
        let sentry_dsn = env.get_optional("SENTRY_DSN");

        Ok(Self {
            catalog_url,
            firebase,
            state_path,
            wishlist_concurrency,
            sentry_dsn,
        })
    }

    /// Firebase configuration, required by the session and wishlist.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` when Firebase is not configured.
    pub fn firebase(&self) -> Result<&FirebaseConfig, ConfigError> {
        self.firebase
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("FIREBASE_API_KEY".to_string()))
    }
}

impl FirebaseConfig {
    fn from_env(env: &Env<'_>) -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = env.get_optional("FIREBASE_API_KEY") else {
            return Ok(None);
        };

        let auth_emulator_host = env.get_optional("FIREBASE_AUTH_EMULATOR_HOST");
        let firestore_emulator_host = env.get_optional("FIRESTORE_EMULATOR_HOST");

        // Emulators accept any key
        if auth_emulator_host.is_none() {
            validate_not_placeholder(&api_key, "FIREBASE_API_KEY")?;
        }

        Ok(Some(Self {
            api_key: SecretString::from(api_key),
            project_id: env.get_required("FIREBASE_PROJECT_ID")?,
            auth_emulator_host,
            firestore_emulator_host,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get a required variable.
    fn get_required(&self, key: &str) -> Result<String, ConfigError> {
        self.get_optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable; blank values count as unset.
    fn get_optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get_optional(key)
            .unwrap_or_else(|| default.to_string())
    }
}

/// Parse an absolute `http`/`https` URL.
fn parse_http_url(var_name: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Reject values that look like a copy-pasted placeholder.
fn validate_not_placeholder(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}
