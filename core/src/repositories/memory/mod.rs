//! In-process store implementing both the OTP and the delivery queue ports.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::entities::{DeliveryStatus, DeliveryTask, OtpPurpose, VerificationRecord};
use crate::errors::DomainError;

use super::otp::OtpRepository;
use super::outbox::DeliveryQueue;

#[derive(Default)]
struct StoreState {
    records: HashMap<Uuid, VerificationRecord>,
    tasks: Vec<DeliveryTask>,
}

/// In-memory outbox store
///
/// A single mutex plays the role of the database transaction: a claim takes the
/// lock, flips the rows to PROCESSING and releases it, so concurrent claimers can
/// never observe the same PENDING row.
#[derive(Clone, Default)]
pub struct InMemoryOutboxStore {
    state: Arc<Mutex<StoreState>>,
    fail_claims: Arc<AtomicBool>,
    fail_updates: Arc<AtomicBool>,
}

impl InMemoryOutboxStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent claim fail, as an unreachable database would
    pub fn set_fail_claims(&self, fail: bool) {
        self.fail_claims.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent single-row task update fail
    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Insert a task directly, bypassing the record write
    pub async fn insert_task(&self, task: DeliveryTask) {
        self.state.lock().await.tasks.push(task);
    }

    /// Snapshot of all tasks in insertion order
    pub async fn tasks(&self) -> Vec<DeliveryTask> {
        self.state.lock().await.tasks.clone()
    }

    pub async fn task(&self, id: Uuid) -> Option<DeliveryTask> {
        self.state.lock().await.tasks.iter().find(|t| t.id == id).cloned()
    }

    pub async fn record(&self, id: Uuid) -> Option<VerificationRecord> {
        self.state.lock().await.records.get(&id).cloned()
    }

    async fn update_task<F>(&self, id: Uuid, apply: F) -> Result<bool, DomainError>
    where
        F: FnOnce(&mut DeliveryTask) -> bool + Send,
    {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(DomainError::storage("task update rejected"));
        }
        let mut state = self.state.lock().await;
        Ok(state.tasks.iter_mut().find(|t| t.id == id).map(apply).unwrap_or(false))
    }
}

#[async_trait]
impl DeliveryQueue for InMemoryOutboxStore {
    async fn claim_pending(&self, limit: u32) -> Result<Vec<DeliveryTask>, DomainError> {
        if self.fail_claims.load(Ordering::SeqCst) {
            return Err(DomainError::storage("claim rejected: store unavailable"));
        }

        let mut state = self.state.lock().await;
        let mut pending: Vec<&mut DeliveryTask> = state
            .tasks
            .iter_mut()
            .filter(|t| t.status == DeliveryStatus::Pending)
            .collect();
        pending.sort_by_key(|t| t.created_at);

        Ok(pending
            .into_iter()
            .take(limit as usize)
            .map(|task| {
                task.mark_processing();
                task.clone()
            })
            .collect())
    }

    async fn mark_sent(&self, id: Uuid) -> Result<bool, DomainError> {
        self.update_task(id, |task| task.mark_sent(Utc::now())).await
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<bool, DomainError> {
        let error = error.to_string();
        self.update_task(id, move |task| task.mark_failed(&error, Utc::now())).await
    }

    async fn requeue(&self, id: Uuid, error: &str) -> Result<bool, DomainError> {
        let error = error.to_string();
        self.update_task(id, move |task| task.requeue(&error)).await
    }
}

#[async_trait]
impl OtpRepository for InMemoryOutboxStore {
    async fn save_with_task(&self, record: &VerificationRecord, task: &DeliveryTask) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        if state.records.contains_key(&record.id) {
            return Err(DomainError::storage(format!("duplicate verification record {}", record.id)));
        }
        state.records.insert(record.id, record.clone());
        state.tasks.push(task.clone());
        Ok(())
    }

    async fn find_active(&self, reference_id: Uuid, purpose: OtpPurpose) -> Result<Option<VerificationRecord>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .get(&reference_id)
            .filter(|r| r.purpose == purpose && !r.used)
            .cloned())
    }

    async fn mark_used(&self, reference_id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.state.lock().await;
        Ok(state
            .records
            .get_mut(&reference_id)
            .map(|r| r.mark_as_used())
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests;
