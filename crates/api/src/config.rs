//! Application configuration loaded from environment variables.

use std::time::Duration;

use common::UserId;
use domain::{Identity, Money};
use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An `API_TOKENS` entry could not be parsed.
    #[error("Invalid API_TOKENS entry {entry:?}: {reason}")]
    InvalidToken { entry: String, reason: String },
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// A bearer token seeded from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub token: String,
    pub identity: Identity,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `DATABASE_URL`: PostgreSQL URL; unset keeps documents in memory
/// - `PAYMENT_GATEWAY_URL` / `PAYMENT_GATEWAY_SECRET`: HTTP gateway; unset uses
///   the in-memory gateway
/// - `PAYMENT_TIMEOUT_MS`: gateway call timeout (default: `10000`)
/// - `CHECKOUT_COMMIT_RETRIES`: commit attempts on conflict (default: `3`)
/// - `CHECKOUT_HOLD_TTL_SECS`: how long a checkout holds the cart (default: `120`)
/// - `COUPON_DISCOUNT_FLOOR_CENTS`: lowest discounted amount (default: `0`)
/// - `DEFAULT_CURRENCY`: currency when a checkout omits one (default: `"usd"`)
/// - `API_TOKENS`: comma separated `token:user_uuid[:admin]` entries
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub payment_gateway_url: Option<String>,
    pub payment_gateway_secret: Option<String>,
    pub payment_timeout: Duration,
    pub checkout_commit_retries: usize,
    pub checkout_hold_ttl: Duration,
    pub coupon_discount_floor: Money,
    pub default_currency: String,
    pub api_tokens: Vec<TokenGrant>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: env_or("HOST", defaults.host),
            port: env_parse("PORT", defaults.port),
            log_level: env_or("RUST_LOG", defaults.log_level),
            log_format: match env("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            database_url: env("DATABASE_URL"),
            payment_gateway_url: env("PAYMENT_GATEWAY_URL"),
            payment_gateway_secret: env("PAYMENT_GATEWAY_SECRET"),
            payment_timeout: Duration::from_millis(env_parse(
                "PAYMENT_TIMEOUT_MS",
                defaults.payment_timeout.as_millis() as u64,
            )),
            checkout_commit_retries: env_parse(
                "CHECKOUT_COMMIT_RETRIES",
                defaults.checkout_commit_retries,
            ),
            checkout_hold_ttl: Duration::from_secs(env_parse(
                "CHECKOUT_HOLD_TTL_SECS",
                defaults.checkout_hold_ttl.as_secs(),
            )),
            coupon_discount_floor: Money::from_cents(env_parse(
                "COUPON_DISCOUNT_FLOOR_CENTS",
                defaults.coupon_discount_floor.cents(),
            )),
            default_currency: env_or("DEFAULT_CURRENCY", defaults.default_currency),
            api_tokens: match env("API_TOKENS") {
                Some(raw) => parse_tokens(&raw)?,
                None => Vec::new(),
            },
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            payment_gateway_url: None,
            payment_gateway_secret: None,
            payment_timeout: Duration::from_millis(10_000),
            checkout_commit_retries: 3,
            checkout_hold_ttl: Duration::from_secs(120),
            coupon_discount_floor: Money::zero(),
            default_currency: "usd".to_string(),
            api_tokens: Vec::new(),
        }
    }
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: String) -> String {
    env(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Parses `token:user_uuid[:admin]` entries separated by commas.
pub fn parse_tokens(raw: &str) -> Result<Vec<TokenGrant>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = |reason: &str| ConfigError::InvalidToken {
                entry: entry.to_string(),
                reason: reason.to_string(),
            };
            let mut parts = entry.split(':');
            let token = parts.next().filter(|t| !t.is_empty()).ok_or_else(|| invalid("empty token"))?;
            let user_id = parts
                .next()
                .ok_or_else(|| invalid("missing user id"))
                .and_then(|id| UserId::parse(id).map_err(|e| invalid(&e.to_string())))?;
            let is_admin = match parts.next() {
                None => false,
                Some("admin") => true,
                Some(other) => return Err(invalid(&format!("unknown role {other:?}"))),
            };
            if parts.next().is_some() {
                return Err(invalid("too many fields"));
            }
            Ok(TokenGrant {
                token: token.to_string(),
                identity: Identity { user_id, is_admin },
            })
        })
        .collect()
}
