//! Flow token and code hashing configuration

use serde::{Deserialize, Serialize};

use super::{env_or, env_string};

const DEFAULT_SECRET: &str = "development-secret-please-change-in-production";

/// Configuration for the signed token that proves a verified OTP step
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    /// HMAC secret used to sign tokens
    pub secret: String,

    /// `iss` claim written and required on validation
    pub issuer: String,

    /// Token lifetime in minutes
    pub expiration_minutes: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_SECRET.to_string(),
            issuer: String::from("keygate-otp-service"),
            expiration_minutes: 10,
        }
    }
}

impl TokenConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            secret: env_string("FLOW_TOKEN_SECRET", DEFAULT_SECRET),
            issuer: env_string("FLOW_TOKEN_ISSUER", &defaults.issuer),
            expiration_minutes: env_or("FLOW_TOKEN_EXPIRATION_MINUTES", defaults.expiration_minutes),
        }
    }

    /// Check if using default secret (security warning)
    pub fn is_using_default_secret(&self) -> bool {
        self.secret == DEFAULT_SECRET
    }
}

/// Cost settings for the one-way code hash
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HashingConfig {
    /// bcrypt work factor (4..=31)
    pub bcrypt_cost: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self { bcrypt_cost: 10 }
    }
}

impl HashingConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self {
            bcrypt_cost: env_or("OTP_BCRYPT_COST", Self::default().bcrypt_cost),
        }
    }
}
