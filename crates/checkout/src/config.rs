//! Checkout configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SHOPDESK_SHIPPING_FEE` - Flat shipping fee per order (default: 15.00)
//! - `SHOPDESK_VERIFY_PRICES` - Check cart prices against the catalog before
//!   placing an order (default: false)
//! - `SHOPDESK_DATABASE_URL` - `PostgreSQL` connection string, falling back to
//!   `DATABASE_URL`. Only commands that touch the database need it.

use secrecy::SecretString;
use shopdesk_core::Price;
use thiserror::Error;

use crate::order::OrderBuilder;

const DEFAULT_SHIPPING_FEE: &str = "15.00";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Checkout configuration.
///
/// Implements `Debug` manually to redact the database URL.
#[derive(Clone)]
pub struct CheckoutConfig {
    /// Flat shipping fee, rounded to cents
    pub shipping_fee: Price,
    /// Whether submissions run the catalog price check
    pub verify_prices: bool,
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
}

impl std::fmt::Debug for CheckoutConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutConfig")
            .field("shipping_fee", &self.shipping_fee)
            .field("verify_prices", &self.verify_prices)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            shipping_fee: OrderBuilder::default().shipping_fee(),
            verify_prices: false,
            database_url: None,
        }
    }
}

impl CheckoutConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let shipping_fee = env
            .get_or_default("SHOPDESK_SHIPPING_FEE", DEFAULT_SHIPPING_FEE)
            .parse::<Price>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("SHOPDESK_SHIPPING_FEE".to_string(), e.to_string())
            })?
            .round_cents();
        let verify_prices = parse_bool(
            "SHOPDESK_VERIFY_PRICES",
            &env.get_or_default("SHOPDESK_VERIFY_PRICES", "false"),
        )?;
        let database_url = env.database_url("SHOPDESK_DATABASE_URL");

        Ok(Self {
            shipping_fee,
            verify_prices,
            database_url,
        })
    }

    /// The database URL, for commands that need one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if no database URL is configured.
    pub fn require_database_url(&self) -> Result<&SecretString, ConfigError> {
        self.database_url
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("SHOPDESK_DATABASE_URL".to_string()))
    }

    /// An order builder charging the configured shipping fee.
    #[must_use]
    pub fn order_builder(&self) -> OrderBuilder {
        OrderBuilder::new(self.shipping_fee)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an environment variable, treating blank values as unset.
    fn get_optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get an environment variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get_optional(key)
            .unwrap_or_else(|| default.to_string())
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Option<SecretString> {
        self.get_optional(primary_key)
            .or_else(|| self.get_optional("DATABASE_URL"))
            .map(SecretString::from)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got {other:?}"),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<CheckoutConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        CheckoutConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.shipping_fee.to_string(), "15.00");
        assert!(!config.verify_prices);
        assert!(config.database_url.is_none());
        assert!(matches!(
            config.require_database_url(),
            Err(ConfigError::MissingEnvVar(_))
        ));
    }

    #[test]
    fn test_shipping_fee_rounded() {
        let config = load(&[("SHOPDESK_SHIPPING_FEE", "9.999")]).unwrap();
        assert_eq!(config.shipping_fee.to_string(), "10.00");
        assert_eq!(config.order_builder().shipping_fee(), config.shipping_fee);
    }

    #[test]
    fn test_invalid_shipping_fee() {
        let err = load(&[("SHOPDESK_SHIPPING_FEE", "-1")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "SHOPDESK_SHIPPING_FEE"));
    }

    #[test]
    fn test_verify_prices_flag() {
        assert!(load(&[("SHOPDESK_VERIFY_PRICES", "TRUE")]).unwrap().verify_prices);
        assert!(!load(&[("SHOPDESK_VERIFY_PRICES", "0")]).unwrap().verify_prices);
        assert!(load(&[("SHOPDESK_VERIFY_PRICES", "maybe")]).is_err());
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[("DATABASE_URL", "postgres://fallback")]).unwrap();
        assert_eq!(
            config.database_url.unwrap().expose_secret(),
            "postgres://fallback"
        );

        let config = load(&[
            ("SHOPDESK_DATABASE_URL", "postgres://primary"),
            ("DATABASE_URL", "postgres://fallback"),
        ])
        .unwrap();
        assert_eq!(
            config.require_database_url().unwrap().expose_secret(),
            "postgres://primary"
        );
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = load(&[("SHOPDESK_DATABASE_URL", "postgres://user:hunter2@db")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
