//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CELLSHOP_API_BASE_URL` - Base URL of the shop REST API
//! - `CELLSHOP_ADMIN_TOKEN` - Bearer token of an admin account (HIGH PRIVILEGE)
//!
//! ## Optional
//! - `CELLSHOP_API_TIMEOUT_SECS` - Per-request timeout (default: 10)

use std::collections::HashMap;

use cellshop_storefront::{ApiConfig, StorefrontConfig};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const ADMIN_TOKEN_VAR: &str = "CELLSHOP_ADMIN_TOKEN";
const MIN_TOKEN_LENGTH: usize = 20;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "token",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Api(#[from] cellshop_storefront::ConfigError),
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Admin client configuration.
///
/// Implements `Debug` manually to redact the admin token.
#[derive(Clone)]
pub struct AdminConfig {
    /// REST API settings shared with the storefront client
    pub api: ApiConfig,
    /// Admin bearer token
    pub token: SecretString,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("api", &self.api)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AdminConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api = StorefrontConfig::from_lookup(&lookup)?.api;
        let token = lookup(ADMIN_TOKEN_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(ADMIN_TOKEN_VAR.to_string()))?;
        validate_secret_strength(&token, ADMIN_TOKEN_VAR)?;
        Ok(Self {
            api,
            token: SecretString::from(token),
        })
    }

    /// The token, for building the client.
    #[must_use]
    pub(crate) fn token(&self) -> SecretString {
        SecretString::from(self.token.expose_secret().to_string())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // Token length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholders, short values and low-entropy strings.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| ConfigError::InsecureSecret(var_name.to_string(), reason);
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(insecure(format!(
            "appears to be a placeholder (contains '{pattern}')"
        )));
    }

    if secret.len() < MIN_TOKEN_LENGTH {
        return Err(insecure(format!(
            "too short ({} chars, need >= {MIN_TOKEN_LENGTH})",
            secret.len()
        )));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(insecure(format!(
            "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
        )));
    }

    Ok(())
}
