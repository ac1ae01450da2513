use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use thiserror::Error;

/// Environment variable overriding `payment_gateway.merchant_id`
pub const MERCHANT_ID_ENV: &str = "ZARINPAL_MERCHANT_ID";
/// Environment variable overriding `card_issuer.api_token`
pub const CARD_ISSUER_TOKEN_ENV: &str = "BROCARD_API_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL; without it the service runs on the
    /// in-memory store
    #[serde(default)]
    pub postgres_url: Option<String>,
    pub payment_gateway: PaymentGatewayConfig,
    pub card_issuer: CardIssuerConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
}

/// HTTP listener
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

/// Zarinpal payment gateway
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaymentGatewayConfig {
    #[serde(default)]
    pub merchant_id: String,
    #[serde(default = "default_request_url")]
    pub request_url: String,
    #[serde(default = "default_verify_url")]
    pub verify_url: String,
    /// `{authority}` is replaced with the gateway token
    #[serde(default = "default_start_pay_url")]
    pub start_pay_url: String,
    /// Where the gateway sends the user back to
    pub callback_url: String,
    #[serde(default = "default_gateway_timeout_ms")]
    pub timeout_ms: u64,
    /// Use the in-process mock gateway
    #[serde(default)]
    pub sandbox: bool,
}

fn default_request_url() -> String {
    "https://api.zarinpal.com/pg/v4/payment/request.json".to_string()
}

fn default_verify_url() -> String {
    "https://api.zarinpal.com/pg/v4/payment/verify.json".to_string()
}

fn default_start_pay_url() -> String {
    "https://www.zarinpal.com/pg/StartPay/{authority}".to_string()
}

fn default_gateway_timeout_ms() -> u64 {
    20_000
}

/// Brocard card issuer
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CardIssuerConfig {
    #[serde(default = "default_card_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_card_type")]
    pub card_type: String,
    /// Balance loaded onto each issued card (USD)
    #[serde(default = "default_card_amount")]
    pub card_amount: Decimal,
    #[serde(default = "default_card_timeout_ms")]
    pub timeout_ms: u64,
    /// Use the in-process mock issuer
    #[serde(default)]
    pub sandbox: bool,
}

fn default_card_base_url() -> String {
    "https://private.mybrocard.com/api/v1".to_string()
}

fn default_card_type() -> String {
    "visa_universal".to_string()
}

fn default_card_amount() -> Decimal {
    Decimal::new(2, 0)
}

fn default_card_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InventoryConfig {
    /// Open placeholder units for shared products when no seat is free
    pub lazy_provision_shared: bool,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            lazy_provision_shared: true,
        }
    }
}

/// Payment recovery worker
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecoveryConfig {
    pub enabled: bool,
    pub scan_interval_secs: u64,
    /// Age after which a non-terminal payment is considered abandoned
    pub stale_after_secs: u64,
    pub batch_size: i64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval_secs: 60,
            stale_after_secs: 1800,
            batch_size: 100,
        }
    }
}

impl AppConfig {
    /// Load `config/<env>.yaml` and apply secret overrides from the
    /// environment.
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        let mut config = Self::from_yaml(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: config_path.clone(),
                source,
            },
            other => other,
        })?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup(MERCHANT_ID_ENV).filter(|v| !v.is_empty()) {
            self.payment_gateway.merchant_id = id;
        }
        if let Some(token) = lookup(CARD_ISSUER_TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.card_issuer.api_token = token;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.payment_gateway.sandbox && self.payment_gateway.merchant_id.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "payment_gateway.merchant_id is empty (set {} or enable sandbox)",
                MERCHANT_ID_ENV
            )));
        }
        if !self.card_issuer.sandbox && self.card_issuer.api_token.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "card_issuer.api_token is empty (set {} or enable sandbox)",
                CARD_ISSUER_TOKEN_ENV
            )));
        }
        if self.card_issuer.card_amount <= Decimal::ZERO {
            return Err(ConfigError::Invalid(
                "card_issuer.card_amount must be positive".to_string(),
            ));
        }
        if self.payment_gateway.timeout_ms == 0 || self.card_issuer.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero".to_string()));
        }
        if !matches!(self.rotation.as_str(), "hourly" | "daily" | "never") {
            return Err(ConfigError::Invalid(format!(
                "rotation must be hourly, daily or never, got {}",
                self.rotation
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
log_level: info
log_dir: ./logs
log_file: permia.log
use_json: false
rotation: daily
gateway:
  host: 0.0.0.0
  port: 8080
payment_gateway:
  callback_url: http://localhost:8080/api/v1/payments/callback
  sandbox: true
card_issuer:
  sandbox: true
"#;

    #[test]
    fn test_defaults_fill_in() {
        let config = AppConfig::from_yaml(YAML).unwrap();
        assert!(config.postgres_url.is_none());
        assert_eq!(config.payment_gateway.timeout_ms, 20_000);
        assert_eq!(config.card_issuer.card_type, "visa_universal");
        assert!(config.inventory.lazy_provision_shared);
        assert_eq!(config.recovery.stale_after_secs, 1800);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_secrets() {
        let mut config = AppConfig::from_yaml(YAML).unwrap();
        config.apply_env_overrides(|key| match key {
            MERCHANT_ID_ENV => Some("merchant-xyz".to_string()),
            CARD_ISSUER_TOKEN_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.payment_gateway.merchant_id, "merchant-xyz");
        assert!(config.card_issuer.api_token.is_empty());
    }

    #[test]
    fn test_live_gateway_requires_merchant() {
        let mut config = AppConfig::from_yaml(YAML).unwrap();
        config.payment_gateway.sandbox = false;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_bad_yaml_is_error_not_panic() {
        assert!(matches!(
            AppConfig::from_yaml("gateway: [1, 2"),
            Err(ConfigError::Parse { .. })
        ));
    }
}
