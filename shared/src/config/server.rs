//! Health endpoint listener

use serde::{Deserialize, Serialize};

use super::{env_or, env_string};

/// Where the worker serves `/health`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
        }
    }
}

impl ServerConfig {
    /// `HEALTH_HOST` / `HEALTH_PORT`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_string("HEALTH_HOST", &defaults.host),
            port: env_or("HEALTH_PORT", defaults.port),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
