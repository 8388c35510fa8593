//! Shared configuration and utilities for the Keygate workspace
//!
//! This crate provides functionality used across all server modules:
//! - Configuration types loaded from the environment
//! - Target masking helpers for log output

pub mod config;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, ChannelsConfig, DatabaseConfig, EmailConfig, Environment, HashingConfig,
    LogFormat, LoggingConfig, OutboxConfig, ServerConfig, SmsProvider, TokenConfig,
    TwilioConfig,
};
pub use utils::mask;
