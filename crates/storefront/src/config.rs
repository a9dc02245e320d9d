//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CELLSHOP_API_BASE_URL` - Base URL of the shop REST API (e.g. `https://api.example.vn/api`)
//!
//! ## Optional
//! - `CELLSHOP_API_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `CELLSHOP_PRODUCT_CACHE_TTL_SECS` - Product listing cache TTL (default: 60)
//! - `CELLSHOP_STATE_DIR` - Directory used as local storage (default: `.cellshop`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PRODUCT_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_PRODUCT_CACHE_CAPACITY: u64 = 500;
const DEFAULT_STATE_DIR: &str = ".cellshop";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// REST API settings
    pub api: ApiConfig,
    /// Directory backing local storage (cart/wishlist mirrors, device id, token)
    pub state_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production", "staging")
    pub sentry_environment: Option<String>,
}

/// REST API client settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: Url,
    /// Fixed timeout applied to every request
    pub timeout: Duration,
    /// How long product listings stay cached
    pub product_cache_ttl: Duration,
    /// Maximum number of cached listing/detail responses
    pub product_cache_capacity: u64,
}

impl ApiConfig {
    /// Settings with default timeout and cache for the given base URL.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            product_cache_ttl: Duration::from_secs(DEFAULT_PRODUCT_CACHE_TTL_SECS),
            product_cache_capacity: DEFAULT_PRODUCT_CACHE_CAPACITY,
        }
    }

    /// Override the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the product cache TTL. A zero TTL disables caching.
    #[must_use]
    pub const fn with_product_cache_ttl(mut self, ttl: Duration) -> Self {
        self.product_cache_ttl = ttl;
        self
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(&get_required(&lookup, "CELLSHOP_API_BASE_URL")?)?;
        let timeout = get_secs(&lookup, "CELLSHOP_API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "CELLSHOP_API_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let product_cache_ttl = get_secs(
            &lookup,
            "CELLSHOP_PRODUCT_CACHE_TTL_SECS",
            DEFAULT_PRODUCT_CACHE_TTL_SECS,
        )?;
        let state_dir = lookup("CELLSHOP_STATE_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_STATE_DIR), PathBuf::from);

        Ok(Self {
            api: ApiConfig {
                base_url,
                timeout,
                product_cache_ttl,
                product_cache_capacity: DEFAULT_PRODUCT_CACHE_CAPACITY,
            },
            state_dir,
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    lookup(key).map_or(Ok(Duration::from_secs(default)), |value| {
        value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse the API base URL; it must be http(s) and able to carry path segments.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unparseable or non-http URLs.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar("CELLSHOP_API_BASE_URL".to_string(), reason);
    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot be used as a base".to_string()));
    }
    Ok(url)
}
