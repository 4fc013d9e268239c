//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local use.

use crate::services::outbox::RetryPolicy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone, Validate)]
pub struct Config {
    /// Base URL of the storefront REST API (the cart lives at `{base}/cart`)
    #[validate(url)]
    pub api_base_url: String,
    /// Directory backing the local key-value store
    pub storage_dir: PathBuf,
    /// Storage key holding the serialized cart
    #[validate(length(min = 1))]
    pub cart_storage_key: String,
    /// Currency code applied when a course does not carry one
    #[validate(length(min = 1))]
    pub default_currency: String,
    /// Retries after the first failed sync attempt
    pub sync_max_retries: u32,
    /// First backoff delay; doubles on each retry
    pub sync_base_delay_ms: u64,
    /// Timeout for each remote cart request
    #[validate(range(min = 1))]
    pub http_timeout_secs: u64,
    /// Telegram handle receiving checkout requests
    #[validate(length(min = 1))]
    pub checkout_contact: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5050/api".to_string(),
            storage_dir: PathBuf::from(".course-cart"),
            cart_storage_key: crate::storage::keys::CART.to_string(),
            default_currency: "UZS".to_string(),
            sync_max_retries: 3,
            sync_base_delay_ms: 200,
            http_timeout_secs: 10,
            checkout_contact: "abdukarimov_arch".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();
        let config = Self {
            api_base_url: env::var("CART_API_BASE_URL").unwrap_or(defaults.api_base_url),
            storage_dir: env::var("CART_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            cart_storage_key: env::var("CART_STORAGE_KEY").unwrap_or(defaults.cart_storage_key),
            default_currency: env::var("CART_DEFAULT_CURRENCY")
                .unwrap_or(defaults.default_currency),
            sync_max_retries: parse_var("CART_SYNC_MAX_RETRIES", defaults.sync_max_retries)?,
            sync_base_delay_ms: parse_var("CART_SYNC_BASE_DELAY_MS", defaults.sync_base_delay_ms)?,
            http_timeout_secs: parse_var("CART_HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            checkout_contact: env::var("CHECKOUT_CONTACT")
                .map(|v| v.trim().trim_start_matches('@').to_string())
                .unwrap_or(defaults.checkout_contact),
        };

        config
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(config)
    }

    /// Backoff policy for the sync outbox.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.sync_max_retries,
            base_delay: Duration::from_millis(self.sync_base_delay_ms),
        }
    }

    /// Timeout applied to each remote cart request.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
