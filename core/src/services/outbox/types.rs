//! Run results and counters of the drain engine

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::DeliveryError;

/// Counts of one drain run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub claimed: usize,
    pub sent: usize,
    pub failed: usize,
    pub requeued: usize,
    /// Outcomes that could not be recorded; the row stays PROCESSING
    pub store_errors: usize,
}

impl DrainReport {
    /// Whether every claimed task reached a recorded outcome
    pub fn is_clean(&self) -> bool {
        self.store_errors == 0
    }
}

/// What a trigger did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(DrainReport),
    /// Another run was in flight
    Skipped,
}

impl RunOutcome {
    pub fn report(&self) -> Option<&DrainReport> {
        match self {
            RunOutcome::Completed(report) => Some(report),
            RunOutcome::Skipped => None,
        }
    }
}

/// Why a single task was not delivered
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeliveryFailure {
    /// Payload could not be parsed; retrying cannot help
    #[error("Corrupt payload: {0}")]
    PayloadCorruption(String),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl DeliveryFailure {
    pub fn is_retryable(&self) -> bool {
        match self {
            DeliveryFailure::PayloadCorruption(_) => false,
            DeliveryFailure::Delivery(DeliveryError::UnsupportedChannel { .. }) => false,
            DeliveryFailure::Delivery(DeliveryError::InvalidTarget { .. }) => false,
            DeliveryFailure::Delivery(_) => true,
        }
    }
}

/// Lifetime counters of an engine, exposed on the health endpoint
#[derive(Debug, Clone, Default, Serialize)]
pub struct DrainStats {
    pub runs_completed: u64,
    pub runs_skipped: u64,
    pub runs_failed: u64,
    pub tasks_sent: u64,
    pub tasks_failed: u64,
    pub tasks_requeued: u64,
    pub store_errors: u64,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}
