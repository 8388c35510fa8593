//! Outbox drain configuration

use serde::{Deserialize, Serialize};

use super::env_or;

/// Scheduling and retry settings for the outbox drain loop
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutboxConfig {
    /// Whether this process runs the drain loop at all
    pub enabled: bool,

    /// Seconds between drain firings
    pub interval_seconds: u64,

    /// Maximum rows claimed per run
    pub batch_size: u32,

    /// Claims allowed per row before it is marked FAILED (1 = no retry)
    pub max_attempts: u32,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 5,
            batch_size: 10,
            max_attempts: 1,
        }
    }
}

impl OutboxConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_or("OUTBOX_ENABLED", defaults.enabled),
            interval_seconds: env_or("OUTBOX_INTERVAL_SECONDS", defaults.interval_seconds),
            batch_size: env_or("OUTBOX_BATCH_SIZE", defaults.batch_size),
            max_attempts: env_or("OUTBOX_MAX_ATTEMPTS", defaults.max_attempts),
        }
    }
}
