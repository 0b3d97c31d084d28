//! Checkout configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PERILLA_BACKEND_URL` - Base URL of the shop backend API
//!
//! ## Optional
//! - `PERILLA_API_TIMEOUT_SECS` - Per-call bound for preview, verification,
//!   and order creation (default: 10)
//! - `PERILLA_CREATE_ORDER_RETRIES` - Automatic idempotent retries of order
//!   creation before giving up (default: 2)
//!
//! Buyer credentials are not configuration; they arrive per session as a
//! [`crate::context::SessionContext`].

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Checkout engine configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Base URL of the shop backend API.
    pub backend_url: Url,
    /// Per-call bound for every backend step. The gateway wait is never
    /// bounded.
    pub api_timeout: Duration,
    /// Automatic idempotent retries of order creation.
    pub create_order_retries: u32,
}

impl CheckoutConfig {
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

        let backend_url = parse_url("PERILLA_BACKEND_URL", &get_required_env("PERILLA_BACKEND_URL")?)?;
        let api_timeout = parse_seconds(
            "PERILLA_API_TIMEOUT_SECS",
            &get_env_or_default("PERILLA_API_TIMEOUT_SECS", "10"),
        )?;
        let create_order_retries = get_env_or_default("PERILLA_CREATE_ORDER_RETRIES", "2")
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("PERILLA_CREATE_ORDER_RETRIES".to_string(), e.to_string())
            })?;

        Ok(Self {
            backend_url,
            api_timeout,
            create_order_retries,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a URL-valued variable.
fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a whole-seconds duration.
fn parse_seconds(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let secs = value
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "timeout must be at least 1 second".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}
