//! Application configuration management.

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::types::Currency;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Payment gateway configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Group lifecycle configuration.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration as loaded from config sources.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for verifying tokens.
    pub secret: String,
    /// Issuer the identity provider stamps on its tokens.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Clock skew tolerated on token expiry, in seconds.
    #[serde(default = "default_token_leeway")]
    pub leeway_secs: u64,
    /// Lifetime of seeder-issued development tokens, in seconds.
    #[serde(default = "default_dev_token_ttl")]
    pub dev_token_ttl_secs: i64,
}

fn default_token_leeway() -> u64 {
    30
}

fn default_dev_token_ttl() -> i64 {
    3600 // 1 hour
}

/// Payment gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the gateway REST API.
    #[serde(default = "default_gateway_api_base")]
    pub api_base: String,
    /// Secret API key used to mint payment intents.
    #[serde(default)]
    pub secret_key: String,
    /// Shared secret used to sign webhook deliveries.
    #[serde(default)]
    pub webhook_secret: String,
    /// ISO 4217 currency used for payment intents.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Upper bound for a single gateway call.
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
    /// Maximum accepted age of a signed webhook delivery.
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,
    /// Use the in-process mock gateway instead of the HTTP one.
    #[serde(default)]
    pub mock: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_base: default_gateway_api_base(),
            secret_key: String::new(),
            webhook_secret: String::new(),
            currency: default_currency(),
            timeout_secs: default_gateway_timeout(),
            webhook_tolerance_secs: default_webhook_tolerance(),
            mock: false,
        }
    }
}

impl GatewayConfig {
    /// Parses the configured settlement currency.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidSetting` for an unsupported currency code.
    pub fn currency(&self) -> AppResult<Currency> {
        self.currency
            .parse()
            .map_err(|reason: String| AppError::InvalidSetting {
                key: "gateway.currency",
                reason,
            })
    }
}

fn default_gateway_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_gateway_timeout() -> u64 {
    10
}

fn default_webhook_tolerance() -> i64 {
    300 // 5 minutes
}

/// Group lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    /// How often the deadline sweep runs.
    #[serde(default = "default_expiry_sweep_interval")]
    pub expiry_sweep_interval_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            expiry_sweep_interval_secs: default_expiry_sweep_interval(),
        }
    }
}

fn default_expiry_sweep_interval() -> u64 {
    60
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if configuration cannot be loaded.
    pub fn load() -> AppResult<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("GROUPBUY").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_applies_defaults() {
        temp_env::with_vars(
            [
                ("GROUPBUY__DATABASE__URL", Some("postgres://localhost/groupbuy")),
                ("GROUPBUY__JWT__SECRET", Some("test-secret")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/groupbuy");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.jwt.leeway_secs, 30);
                assert_eq!(config.jwt.dev_token_ttl_secs, 3600);
                assert!(config.jwt.issuer.is_none());
                assert_eq!(config.gateway.currency, "INR");
                assert_eq!(config.gateway.timeout_secs, 10);
                assert!(!config.gateway.mock);
                assert_eq!(config.lifecycle.expiry_sweep_interval_secs, 60);
            },
        );
    }

    #[test]
    fn test_load_reads_gateway_overrides() {
        temp_env::with_vars(
            [
                ("GROUPBUY__DATABASE__URL", Some("postgres://localhost/groupbuy")),
                ("GROUPBUY__JWT__SECRET", Some("test-secret")),
                ("GROUPBUY__GATEWAY__WEBHOOK_SECRET", Some("whsec_test")),
                ("GROUPBUY__GATEWAY__CURRENCY", Some("USD")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.gateway.webhook_secret, "whsec_test");
                assert_eq!(config.gateway.currency, "USD");
                assert_eq!(config.gateway.currency().unwrap(), Currency::Usd);
            },
        );
    }

    #[test]
    fn test_load_fails_without_database_url() {
        temp_env::with_vars(
            [
                ("GROUPBUY__DATABASE__URL", None::<&str>),
                ("GROUPBUY__JWT__SECRET", Some("test-secret")),
            ],
            || {
                assert!(matches!(AppConfig::load(), Err(AppError::Config(_))));
            },
        );
    }

    #[test]
    fn test_unsupported_currency_is_rejected() {
        let gateway = GatewayConfig {
            currency: "XYZ".to_string(),
            ..GatewayConfig::default()
        };
        assert!(matches!(
            gateway.currency(),
            Err(AppError::InvalidSetting {
                key: "gateway.currency",
                ..
            })
        ));
    }
}
