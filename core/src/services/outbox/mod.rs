//! Outbox drain engine
//!
//! Periodically claims PENDING delivery tasks, hands each to the dispatcher and
//! records the outcome. Runs are single-flight per process: a firing that finds
//! a run in progress is skipped, never queued. Across processes the store's
//! skip-locked claim keeps batches disjoint.

mod config;
mod engine;
mod types;

#[cfg(test)]
mod tests;

pub use config::DrainEngineConfig;
pub use engine::OutboxDrainEngine;
pub use types::{DeliveryFailure, DrainReport, DrainStats, RunOutcome};
