//! Configuration for the drain engine

use std::time::Duration;

use kg_shared::config::OutboxConfig;

/// Configuration for the drain engine
#[derive(Debug, Clone)]
pub struct DrainEngineConfig {
    /// Time between firings
    pub interval: Duration,
    /// Maximum tasks claimed per run
    pub batch_size: u32,
    /// Claims allowed per task before a failure is terminal
    pub max_attempts: u32,
    /// Whether the background loop starts at all
    pub enabled: bool,
}

impl Default for DrainEngineConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            batch_size: 10,
            max_attempts: 1,
            enabled: true,
        }
    }
}

impl From<&OutboxConfig> for DrainEngineConfig {
    fn from(config: &OutboxConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_seconds),
            batch_size: config.batch_size,
            max_attempts: config.max_attempts.max(1),
            enabled: config.enabled,
        }
    }
}
