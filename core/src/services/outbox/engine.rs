//! Drain engine implementation

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use kg_shared::utils::mask_target;

use crate::domain::entities::DeliveryTask;
use crate::errors::DomainError;
use crate::repositories::DeliveryQueue;
use crate::services::delivery::Dispatcher;

use super::config::DrainEngineConfig;
use super::types::{DeliveryFailure, DrainReport, DrainStats, RunOutcome};

/// Clears the in-flight flag however the run ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Single-flight worker draining the delivery queue
pub struct OutboxDrainEngine<Q: DeliveryQueue + 'static> {
    queue: Arc<Q>,
    dispatcher: Arc<Dispatcher>,
    config: DrainEngineConfig,
    running: AtomicBool,
    stats: RwLock<DrainStats>,
}

impl<Q: DeliveryQueue> OutboxDrainEngine<Q> {
    pub fn new(queue: Arc<Q>, dispatcher: Arc<Dispatcher>, config: DrainEngineConfig) -> Self {
        Self {
            queue,
            dispatcher,
            config,
            running: AtomicBool::new(false),
            stats: RwLock::new(DrainStats::default()),
        }
    }

    pub fn config(&self) -> &DrainEngineConfig {
        &self.config
    }

    /// Whether a run is in flight right now
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub async fn stats(&self) -> DrainStats {
        self.stats.read().await.clone()
    }

    /// Fire one drain run unless one is already in flight
    ///
    /// # Returns
    /// * `Ok(RunOutcome::Completed)` - The run finished; per-task failures are in the report
    /// * `Ok(RunOutcome::Skipped)` - Another run held the flag
    /// * `Err(DomainError)` - The claim failed; nothing was claimed
    pub async fn trigger(&self) -> Result<RunOutcome, DomainError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(event = "outbox_run_skipped", "Outbox drain already running, skipping firing");
            self.stats.write().await.runs_skipped += 1;
            return Ok(RunOutcome::Skipped);
        }
        let _guard = RunningGuard(&self.running);

        match self.run_once().await {
            Ok(report) => {
                let mut stats = self.stats.write().await;
                stats.runs_completed += 1;
                stats.tasks_sent += report.sent as u64;
                stats.tasks_failed += report.failed as u64;
                stats.tasks_requeued += report.requeued as u64;
                stats.store_errors += report.store_errors as u64;
                stats.last_run_at = Some(Utc::now());
                Ok(RunOutcome::Completed(report))
            }
            Err(e) => {
                error!(error = %e, event = "outbox_claim_failed", "Outbox drain run aborted");
                let mut stats = self.stats.write().await;
                stats.runs_failed += 1;
                stats.last_run_at = Some(Utc::now());
                stats.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Claim one batch and process it sequentially
    async fn run_once(&self) -> Result<DrainReport, DomainError> {
        let tasks = self.queue.claim_pending(self.config.batch_size).await?;

        let mut report = DrainReport {
            claimed: tasks.len(),
            ..DrainReport::default()
        };
        if tasks.is_empty() {
            return Ok(report);
        }

        debug!(claimed = tasks.len(), event = "outbox_batch_claimed", "Claimed outbox batch");

        for task in &tasks {
            self.process(task, &mut report).await;
        }

        info!(
            claimed = report.claimed,
            sent = report.sent,
            failed = report.failed,
            requeued = report.requeued,
            store_errors = report.store_errors,
            event = "outbox_run_completed",
            "Outbox drain run completed"
        );

        Ok(report)
    }

    async fn process(&self, task: &DeliveryTask, report: &mut DrainReport) {
        match self.deliver(task).await {
            Ok(()) => match self.queue.mark_sent(task.id).await {
                Ok(true) => report.sent += 1,
                Ok(false) => {
                    warn!(task_id = %task.id, event = "outbox_state_conflict", "Task left PROCESSING before it was marked sent");
                    report.store_errors += 1;
                }
                Err(e) => {
                    error!(task_id = %task.id, error = %e, event = "outbox_mark_sent_failed", "Delivered but could not mark task sent");
                    report.store_errors += 1;
                }
            },
            Err(failure) => self.record_failure(task, failure, report).await,
        }
    }

    async fn deliver(&self, task: &DeliveryTask) -> Result<(), DeliveryFailure> {
        let payload = task
            .parse_payload()
            .map_err(|e| DeliveryFailure::PayloadCorruption(e.to_string()))?;

        self.dispatcher
            .send(payload.channel, &payload.target, &payload.otp, payload.purpose)
            .await?;

        info!(
            task_id = %task.id,
            channel = %payload.channel,
            recipient = %mask_target(&payload.target),
            attempt = task.attempts,
            event = "otp_delivered",
            "Delivered verification code"
        );
        Ok(())
    }

    async fn record_failure(&self, task: &DeliveryTask, failure: DeliveryFailure, report: &mut DrainReport) {
        let message = failure.to_string();
        let retry = failure.is_retryable() && task.attempts < self.config.max_attempts;

        let recorded = if retry {
            warn!(
                task_id = %task.id,
                attempt = task.attempts,
                max_attempts = self.config.max_attempts,
                error = %message,
                event = "outbox_delivery_retry",
                "Delivery failed, task requeued"
            );
            self.queue.requeue(task.id, &message).await
        } else {
            error!(
                task_id = %task.id,
                attempt = task.attempts,
                error = %message,
                event = "outbox_delivery_failed",
                "Delivery failed, task marked failed"
            );
            self.queue.mark_failed(task.id, &message).await
        };

        match recorded {
            Ok(true) if retry => report.requeued += 1,
            Ok(true) => report.failed += 1,
            Ok(false) => {
                warn!(task_id = %task.id, event = "outbox_state_conflict", "Task left PROCESSING before its failure was recorded");
                report.store_errors += 1;
            }
            Err(e) => {
                error!(task_id = %task.id, error = %e, event = "outbox_mark_failed_failed", "Could not record delivery failure");
                report.store_errors += 1;
            }
        }
    }

    /// Start the drain loop as a background task
    ///
    /// Each firing runs in its own task so a slow run never delays the timer;
    /// overlapping firings are skipped by [`OutboxDrainEngine::trigger`]. When
    /// `shutdown` turns `true` (or its sender is dropped) the loop stops firing
    /// and awaits every run it spawned that has not finished yet.
    ///
    /// Returns `None` when the engine is disabled.
    pub fn start_background_task(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            warn!("Outbox drain engine is disabled");
            return None;
        }

        Some(tokio::spawn(async move {
            info!(
                interval_ms = self.config.interval.as_millis() as u64,
                batch_size = self.config.batch_size,
                max_attempts = self.config.max_attempts,
                "Outbox drain engine started"
            );

            let mut ticker = tokio::time::interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut runs: Vec<JoinHandle<()>> = Vec::new();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        runs.retain(|run| !run.is_finished());
                        let engine = Arc::clone(&self);
                        runs.push(tokio::spawn(async move {
                            // Failures are logged and counted inside trigger.
                            let _ = engine.trigger().await;
                        }));
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            for run in runs {
                if let Err(e) = run.await {
                    error!(error = %e, event = "outbox_run_panicked", "Outbox drain run ended abnormally");
                }
            }
            info!("Outbox drain engine stopped");
        }))
    }
}
