//! Domain-specific error types and error handling.

use thiserror::Error;

/// Core domain errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Every rejected code collapses into this one variant
    #[error("Invalid or expired verification code")]
    InvalidOtp,

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Token error: {message}")]
    Token { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation { message: message.into() }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        DomainError::Storage { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        DomainError::Internal { message: message.into() }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Failure of a single channel send
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("No sender registered for channel {channel}")]
    UnsupportedChannel { channel: String },

    #[error("Invalid delivery target: {reason}")]
    InvalidTarget { reason: String },

    #[error("{provider} did not respond within {seconds}s")]
    Timeout { provider: String, seconds: u64 },

    #[error("{provider} error: {message}")]
    Provider { provider: String, message: String },
}

impl DeliveryError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        DeliveryError::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
