//! One-way code hashing

use kg_shared::config::HashingConfig;

use crate::errors::{DomainError, DomainResult};

/// Hashes codes for storage and verifies raw codes against stored digests
pub trait CodeHasher: Send + Sync {
    fn hash(&self, raw: &str) -> DomainResult<String>;

    /// Malformed digests verify as `false`
    fn matches(&self, raw: &str, digest: &str) -> bool;
}

/// bcrypt-backed hasher with a configurable work factor
#[derive(Debug, Clone, Copy)]
pub struct BcryptCodeHasher {
    cost: u32,
}

impl BcryptCodeHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptCodeHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl From<&HashingConfig> for BcryptCodeHasher {
    fn from(config: &HashingConfig) -> Self {
        Self::new(config.bcrypt_cost)
    }
}

impl CodeHasher for BcryptCodeHasher {
    fn hash(&self, raw: &str) -> DomainResult<String> {
        bcrypt::hash(raw, self.cost).map_err(|e| DomainError::Internal {
            message: format!("Failed to hash code: {}", e),
        })
    }

    fn matches(&self, raw: &str, digest: &str) -> bool {
        bcrypt::verify(raw, digest).unwrap_or(false)
    }
}
