//! # Keygate Core
//!
//! Core domain layer for one-time passcode delivery.
//! This crate contains the verification record and outbox task entities,
//! the code/token utilities, the channel dispatcher, the outbox drain engine,
//! repository ports and the error types shared by every layer.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::entities::*;
pub use errors::{DeliveryError, DomainError, DomainResult};
pub use repositories::{DeliveryQueue, InMemoryOutboxStore, OtpRepository};
pub use services::{
    BcryptCodeHasher, ChannelSender, CodeGenerator, CodeHasher, Dispatcher, DrainEngineConfig,
    DrainReport, DrainStats, IssuedOtp, OtpIssueRequest, OtpService, OtpValidateRequest,
    OutboxDrainEngine, RunOutcome, SecureCodeGenerator, TokenIssuer, TokenIssuerConfig,
    ValidatedOtp,
};
