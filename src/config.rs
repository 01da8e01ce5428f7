//! Environment configuration (`.env` is honoured through dotenvy).

use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::gateway::stripe::DEFAULT_API_BASE;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable '{0}'")]
    Missing(&'static str),

    #[error("invalid value for '{name}': {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub nats_url: Option<String>,
    pub jwt_secret: String,
    pub auth_cookie_name: String,
    pub stripe_secret_key: String,
    pub stripe_api_base: String,
    pub checkout: CheckoutConfig,
    pub request_timeout: Duration,
}

/// Settings the checkout service itself reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutConfig {
    pub currency: String,
    pub external_call_timeout: Duration,
    /// Reject gateway orders whose captured amount differs from the cart
    /// subtotal instead of only logging the difference.
    pub strict_amount_check: bool,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self { currency: "inr".into(), external_call_timeout: Duration::from_secs(10), strict_amount_check: false }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| get(name).filter(|v| !v.trim().is_empty()).ok_or(ConfigError::Missing(name));

        let config = Self {
            port: parse_or(&get, "PORT", 8083)?,
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            nats_url: get("NATS_URL").filter(|v| !v.trim().is_empty()),
            jwt_secret: required("JWT_SECRET")?,
            auth_cookie_name: get("AUTH_COOKIE_NAME").unwrap_or_else(|| "token".into()),
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            stripe_api_base: get("STRIPE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into()),
            checkout: CheckoutConfig {
                currency: get("CURRENCY").unwrap_or_else(|| "inr".into()).to_lowercase(),
                external_call_timeout: Duration::from_secs(parse_or(&get, "EXTERNAL_CALL_TIMEOUT_SECS", 10)?),
                strict_amount_check: parse_or(&get, "CHECKOUT_STRICT_AMOUNT", false)?,
            },
            request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 30)?),
        };
        tracing::info!(port = config.port, currency = %config.checkout.currency, strict_amount_check = config.checkout.strict_amount_check, "configuration loaded");
        Ok(config)
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid { name, reason: e.to_string() }),
        None => Ok(default),
    }
}
