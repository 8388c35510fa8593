//! Delivery queue port: the durable outbox table seen from the drain engine.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::DeliveryTask;
use crate::errors::DomainError;

/// Storage contract for delivery tasks
///
/// # Concurrency
/// `claim_pending` must be atomic across every process sharing the store: rows
/// locked by a concurrent claimer are skipped, and the returned rows are already
/// committed as PROCESSING when the call returns. The single-row updates only
/// apply to rows still in PROCESSING and report whether they did.
#[async_trait]
pub trait DeliveryQueue: Send + Sync {
    /// Claim up to `limit` PENDING tasks, oldest first
    ///
    /// # Returns
    /// * `Ok(Vec<DeliveryTask>)` - Claimed tasks, status PROCESSING, attempts incremented
    /// * `Err(DomainError)` - Nothing was claimed
    async fn claim_pending(&self, limit: u32) -> Result<Vec<DeliveryTask>, DomainError>;

    /// Mark a claimed task as delivered and redact its code
    async fn mark_sent(&self, id: Uuid) -> Result<bool, DomainError>;

    /// Mark a claimed task as failed with a (truncated) error and redact its code
    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<bool, DomainError>;

    /// Return a claimed task to PENDING for another attempt
    async fn requeue(&self, id: Uuid, error: &str) -> Result<bool, DomainError>;
}
