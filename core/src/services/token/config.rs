//! Configuration for the token issuer

use kg_shared::config::TokenConfig;

/// Configuration for the token issuer
#[derive(Debug, Clone)]
pub struct TokenIssuerConfig {
    /// HMAC signing secret
    pub secret: String,
    /// Value of the `iss` claim
    pub issuer: String,
    /// Token lifetime in minutes
    pub expiration_minutes: i64,
}

impl Default for TokenIssuerConfig {
    fn default() -> Self {
        TokenIssuerConfig::from(&TokenConfig::default())
    }
}

impl From<&TokenConfig> for TokenIssuerConfig {
    fn from(config: &TokenConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            issuer: config.issuer.clone(),
            expiration_minutes: config.expiration_minutes,
        }
    }
}
