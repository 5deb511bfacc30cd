use crate::core::{AppError, Result};
use crate::modules::gateways::GatewayEnvironment;
use rust_decimal::Decimal;
use std::env;
use std::time::Duration;

pub mod database;
pub mod server;

pub use database::DatabaseConfig;
pub use server::ServerConfig;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: Option<DatabaseConfig>,
    pub server: ServerConfig,
    pub mpesa: MpesaConfig,
    pub polling: PollingConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub log_format: LogFormat,
    /// Opens a register session with this float at startup when set
    pub register_opening_float: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Daraja (M-Pesa) gateway settings
#[derive(Debug, Clone)]
pub struct MpesaConfig {
    pub environment: GatewayEnvironment,
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub shortcode: String,
    pub passkey: String,
    pub callback_url: String,
    /// Use the deterministic simulated responder instead of the live gateway
    pub simulate: bool,
    pub token_ttl_cap: Duration,
    pub http_timeout: Duration,
}

/// How long the payment flow keeps polling before reporting a local timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub rate_limit_per_minute: u32,
}

/// Sandbox shortcode published by Safaricom for testing
const SANDBOX_SHORTCODE: &str = "174379";

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = Config {
            app: AppConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                log_format: match env::var("LOG_FORMAT").as_deref() {
                    Ok("json") => LogFormat::Json,
                    _ => LogFormat::Pretty,
                },
                register_opening_float: match env::var("REGISTER_OPENING_FLOAT") {
                    Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().parse().map_err(|_| {
                        AppError::Configuration("Invalid REGISTER_OPENING_FLOAT".to_string())
                    })?),
                    _ => None,
                },
            },
            database: DatabaseConfig::from_env()?,
            server: ServerConfig::from_env()?,
            mpesa: MpesaConfig::from_env()?,
            polling: PollingConfig {
                max_attempts: parse_var("POLL_MAX_ATTEMPTS", 10)?,
                interval: Duration::from_secs(parse_var("POLL_INTERVAL_SECS", 5)?),
            },
            security: SecurityConfig {
                rate_limit_per_minute: parse_var("RATE_LIMIT_PER_MINUTE", 120)?,
            },
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.polling.max_attempts == 0 {
            return Err(AppError::Configuration(
                "POLL_MAX_ATTEMPTS must be greater than 0".to_string(),
            ));
        }

        if self.polling.interval.is_zero() {
            return Err(AppError::Configuration(
                "POLL_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        if self.security.rate_limit_per_minute == 0 {
            return Err(AppError::Configuration(
                "Rate limit must be greater than 0".to_string(),
            ));
        }

        if self.app.register_opening_float.is_some_and(|f| f.is_sign_negative()) {
            return Err(AppError::Configuration(
                "REGISTER_OPENING_FLOAT must not be negative".to_string(),
            ));
        }

        self.mpesa.validate()
    }
}

impl MpesaConfig {
    pub fn from_env() -> Result<Self> {
        let environment: GatewayEnvironment = env::var("MPESA_ENVIRONMENT")
            .unwrap_or_else(|_| "sandbox".to_string())
            .parse()
            .map_err(AppError::Configuration)?;

        let shortcode = env::var("MPESA_SHORTCODE").unwrap_or_else(|_| match environment {
            GatewayEnvironment::Sandbox => SANDBOX_SHORTCODE.to_string(),
            GatewayEnvironment::Production => String::new(),
        });

        Ok(Self {
            base_url: env::var("MPESA_BASE_URL")
                .unwrap_or_else(|_| environment.base_url().to_string()),
            environment,
            consumer_key: env::var("MPESA_CONSUMER_KEY").unwrap_or_default(),
            consumer_secret: env::var("MPESA_CONSUMER_SECRET").unwrap_or_default(),
            shortcode,
            passkey: env::var("MPESA_PASSKEY").unwrap_or_default(),
            callback_url: env::var("MPESA_CALLBACK_URL").unwrap_or_default(),
            simulate: env::var("MPESA_SIMULATE")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false),
            token_ttl_cap: Duration::from_secs(parse_var("MPESA_TOKEN_TTL_CAP_SECS", 3000)?),
            http_timeout: Duration::from_secs(parse_var("MPESA_HTTP_TIMEOUT_SECS", 30)?),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.simulate {
            return Ok(());
        }

        let required = [
            ("MPESA_CONSUMER_KEY", &self.consumer_key),
            ("MPESA_CONSUMER_SECRET", &self.consumer_secret),
            ("MPESA_SHORTCODE", &self.shortcode),
            ("MPESA_PASSKEY", &self.passkey),
            ("MPESA_CALLBACK_URL", &self.callback_url),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::Configuration(format!("{} not set", name)));
            }
        }

        if self.token_ttl_cap.is_zero() {
            return Err(AppError::Configuration(
                "MPESA_TOKEN_TTL_CAP_SECS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Configuration(format!("Invalid {}", name))),
        Err(_) => Ok(default),
    }
}
