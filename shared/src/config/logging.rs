//! Log output configuration

use serde::{Deserialize, Serialize};

use super::Environment;

/// Output shape of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" | "text" => Ok(LogFormat::Compact),
            other => Err(format!("Unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `kg_core=debug,sqlx=warn`
    pub filter: String,
    pub format: LogFormat,
    /// ANSI colours; only useful on a terminal
    pub ansi: bool,
    /// Include file and line of the call site
    pub source_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

impl LoggingConfig {
    /// Human-readable output locally, JSON lines elsewhere
    pub fn for_environment(env: Environment) -> Self {
        if env == Environment::Development {
            Self {
                filter: "debug,sqlx=warn".to_string(),
                format: LogFormat::Pretty,
                ansi: true,
                source_location: true,
            }
        } else {
            Self {
                filter: "info".to_string(),
                format: LogFormat::Json,
                ansi: false,
                source_location: false,
            }
        }
    }

    /// Environment defaults overridden by `LOG_LEVEL` and `LOG_FORMAT`
    pub fn from_env(env: Environment) -> Self {
        let mut config = Self::for_environment(env);
        if let Ok(filter) = std::env::var("LOG_LEVEL") {
            if !filter.trim().is_empty() {
                config.filter = filter;
            }
        }
        if let Some(format) = std::env::var("LOG_FORMAT").ok().and_then(|f| f.parse().ok()) {
            config.format = format;
            config.ansi = config.ansi && format != LogFormat::Json;
        }
        config
    }
}
