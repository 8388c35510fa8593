//! HS256 flow token issuer

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::entities::OtpPurpose;
use crate::errors::DomainError;

use super::config::TokenIssuerConfig;

/// Claims carried by a flow token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowTokenClaims {
    pub iss: String,
    /// Verified target, duplicated in `target`
    pub sub: String,
    pub target: String,
    pub purpose: OtpPurpose,
    /// Expiry as a unix timestamp in seconds
    pub exp: i64,
}

/// A freshly signed token and the instant it stops validating
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and checks flow tokens
pub struct TokenIssuer {
    config: TokenIssuerConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    /// Creates a new issuer from its configuration
    pub fn new(config: TokenIssuerConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            config,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Signs a token for `target` and `purpose`, valid from now
    pub fn generate(&self, target: &str, purpose: OtpPurpose) -> Result<IssuedToken, DomainError> {
        self.generate_at(target, purpose, Utc::now())
    }

    /// Signs a token as if issued at `now`
    pub fn generate_at(
        &self,
        target: &str,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, DomainError> {
        let expires_at = now + Duration::minutes(self.config.expiration_minutes);
        let claims = FlowTokenClaims {
            iss: self.config.issuer.clone(),
            sub: target.to_string(),
            target: target.to_string(),
            purpose,
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| DomainError::Token {
                message: format!("Failed to sign flow token: {}", e),
            })?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Checks a token against the target it should prove.
    ///
    /// Bad signature, wrong issuer, expired, malformed, or a target mismatch
    /// all give `false`.
    pub fn validate(&self, token: &str, expected_target: &str) -> bool {
        let mut validation = self.validation.clone();
        validation.sub = Some(expected_target.to_string());

        match decode::<FlowTokenClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => data.claims.target == expected_target,
            Err(e) => {
                tracing::debug!(error = %e, event = "flow_token_rejected", "Flow token rejected");
                false
            }
        }
    }

    /// Returns the target of a valid token, `None` otherwise
    pub fn extract_target(&self, token: &str) -> Option<String> {
        decode::<FlowTokenClaims>(token, &self.decoding_key, &self.validation)
            .ok()
            .map(|data| data.claims.target)
    }

    /// Decodes the full claim set of a valid token
    pub fn claims(&self, token: &str) -> Option<FlowTokenClaims> {
        decode::<FlowTokenClaims>(token, &self.decoding_key, &self.validation)
            .ok()
            .map(|data| data.claims)
    }
}
