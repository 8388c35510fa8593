//! Verification record persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::{DeliveryTask, OtpPurpose, VerificationRecord};
use crate::errors::DomainError;

/// Repository trait for verification records
#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Persist a record and its delivery task in one atomic write
    ///
    /// Either both rows exist afterwards or neither does.
    async fn save_with_task(&self, record: &VerificationRecord, task: &DeliveryTask) -> Result<(), DomainError>;

    /// Find an unused record by reference id and purpose
    ///
    /// Expiry is not checked here; callers decide against their own clock.
    async fn find_active(&self, reference_id: Uuid, purpose: OtpPurpose) -> Result<Option<VerificationRecord>, DomainError>;

    /// Conditionally mark a record as used
    ///
    /// # Returns
    /// * `Ok(true)` - This call flipped `used`
    /// * `Ok(false)` - Already used or missing
    async fn mark_used(&self, reference_id: Uuid) -> Result<bool, DomainError>;
}
