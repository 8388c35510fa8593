//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `channels` - Delivery channel providers (Twilio, email API)
//! - `database` - Database connection and pool configuration
//! - `environment` - Deployment environment detection
//! - `logging` - Log filter and output format
//! - `outbox` - Drain loop scheduling and retry policy
//! - `server` - Health endpoint binding
//! - `token` - Signed flow token and code hashing parameters

pub mod channels;
pub mod database;
pub mod environment;
pub mod logging;
pub mod outbox;
pub mod server;
pub mod token;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// Re-export commonly used types
pub use channels::{ChannelsConfig, EmailConfig, SmsProvider, TwilioConfig};
pub use database::DatabaseConfig;
pub use environment::Environment;
pub use logging::{LogFormat, LoggingConfig};
pub use outbox::OutboxConfig;
pub use server::ServerConfig;
pub use token::{HashingConfig, TokenConfig};

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Health endpoint configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Outbox drain configuration
    pub outbox: OutboxConfig,

    /// Flow token configuration
    pub token: TokenConfig,

    /// Code hashing configuration
    #[serde(default)]
    pub hashing: HashingConfig,

    /// Delivery channel configuration
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            outbox: OutboxConfig::default(),
            token: TokenConfig::default(),
            hashing: HashingConfig::default(),
            channels: ChannelsConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment
    ///
    /// Reads a `.env` file first if one is present, then builds every
    /// sub-configuration from its own variables.
    ///
    /// # Errors
    /// A provider selector that is set but not recognised (`SMS_PROVIDER=twillio`).
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let environment = Environment::from_env();

        Ok(Self {
            environment,
            server: ServerConfig::from_env(),
            database: DatabaseConfig::from_env(),
            outbox: OutboxConfig::from_env(),
            token: TokenConfig::from_env(),
            hashing: HashingConfig::from_env(),
            channels: ChannelsConfig::from_env()?,
            logging: LoggingConfig::from_env(environment),
        })
    }

    /// Check the configuration for values that must not reach production
    pub fn validate(&self) -> Result<(), String> {
        if self.environment.is_production() && self.token.is_using_default_secret() {
            return Err("FLOW_TOKEN_SECRET must be set in production".to_string());
        }
        if self.token.secret.len() < 32 && self.environment.is_production() {
            return Err("FLOW_TOKEN_SECRET must be at least 32 bytes".to_string());
        }
        if self.outbox.interval_seconds == 0 {
            return Err("OUTBOX_INTERVAL_SECONDS must be greater than zero".to_string());
        }
        if self.outbox.batch_size == 0 {
            return Err("OUTBOX_BATCH_SIZE must be greater than zero".to_string());
        }
        if self.outbox.max_attempts == 0 {
            return Err("OUTBOX_MAX_ATTEMPTS must be at least 1".to_string());
        }
        if self.environment.is_production() {
            if self.channels.sms_provider == SmsProvider::Log {
                return Err("SMS_PROVIDER=log only logs codes and is not allowed in production".to_string());
            }
            if !self.channels.email.is_configured() {
                return Err("EMAIL_API_URL must be set in production".to_string());
            }
        }
        if !(4..=31).contains(&self.hashing.bcrypt_cost) {
            return Err(format!(
                "OTP_BCRYPT_COST must be between 4 and 31, got {}",
                self.hashing.bcrypt_cost
            ));
        }
        Ok(())
    }
}

/// Read an environment variable and parse it, falling back to `default`
/// when the variable is missing or does not parse.
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Like [`env_or`], but a value that is present and does not parse is an error
pub(crate) fn env_parse<T: FromStr<Err = String>>(key: &str, default: T) -> Result<T, String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().parse().map_err(|e| format!("{}: {}", key, e)),
        _ => Ok(default),
    }
}

/// Read a string environment variable with a default
pub(crate) fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
