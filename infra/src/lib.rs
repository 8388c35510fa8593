//! # Infrastructure Layer
//!
//! Concrete implementations of the ports defined in `kg_core`:
//!
//! - **Database**: MySQL connection pool and the outbox store (SQLx), which
//!   implements both `OtpRepository` and `DeliveryQueue`
//! - **Channels**: delivery adapters (Twilio SMS/WhatsApp, HTTP email API,
//!   log-only) and the dispatcher factory

/// Database module - MySQL implementations using SQLx
pub mod database;

/// Delivery channel adapters
pub mod channels;

pub use channels::create_dispatcher;
pub use database::{DatabasePool, MySqlOutboxStore};

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP request error for external services
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Delivery provider error
    #[error("Delivery provider error: {0}")]
    Provider(String),
}
