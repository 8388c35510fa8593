//! Unit tests for the outbox drain engine

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::domain::entities::{
    DeliveryStatus, DeliveryTask, OtpChannel, OtpPurpose, VerificationRecord, MAX_ERROR_LENGTH, REDACTED_OTP,
};
use crate::repositories::InMemoryOutboxStore;
use crate::services::delivery::testing::{BlockingSender, FailingSender, RecordingSender};
use crate::services::delivery::Dispatcher;
use crate::services::otp::{BcryptCodeHasher, OtpIssueRequest, OtpService, SecureCodeGenerator};
use crate::services::outbox::{DrainEngineConfig, DrainReport, OutboxDrainEngine, RunOutcome};
use crate::services::token::{TokenIssuer, TokenIssuerConfig};

fn sms_task(target: &str, code: &str) -> DeliveryTask {
    let record = VerificationRecord::create(target, "hash", OtpPurpose::Login);
    DeliveryTask::create_send_task(&record, code, OtpChannel::Sms, OtpPurpose::Login).unwrap()
}

fn engine(
    store: &InMemoryOutboxStore,
    dispatcher: Dispatcher,
    config: DrainEngineConfig,
) -> Arc<OutboxDrainEngine<InMemoryOutboxStore>> {
    Arc::new(OutboxDrainEngine::new(Arc::new(store.clone()), Arc::new(dispatcher), config))
}

fn completed(outcome: RunOutcome) -> DrainReport {
    match outcome {
        RunOutcome::Completed(report) => report,
        RunOutcome::Skipped => panic!("run was skipped"),
    }
}

#[tokio::test]
async fn test_all_success_marks_every_task_sent() {
    let store = InMemoryOutboxStore::new();
    for (i, target) in ["+51999999991", "+51999999992", "+51999999993"].iter().enumerate() {
        store.insert_task(sms_task(target, &format!("10000{}", i))).await;
    }
    let sms = Arc::new(RecordingSender::new());
    let engine = engine(&store, Dispatcher::new().register(OtpChannel::Sms, sms.clone()), DrainEngineConfig::default());

    let report = completed(engine.trigger().await.unwrap());
    assert_eq!(report, DrainReport { claimed: 3, sent: 3, ..DrainReport::default() });

    for task in store.tasks().await {
        assert_eq!(task.status, DeliveryStatus::Sent);
        assert!(task.terminal_at.is_some());
        assert_eq!(task.parse_payload().unwrap().otp, REDACTED_OTP);
    }
    assert_eq!(sms.sent().await.len(), 3);

    let stats = engine.stats().await;
    assert_eq!(stats.runs_completed, 1);
    assert_eq!(stats.tasks_sent, 3);
}

#[tokio::test]
async fn test_empty_queue_completes_with_nothing_claimed() {
    let store = InMemoryOutboxStore::new();
    let engine = engine(&store, Dispatcher::new(), DrainEngineConfig::default());

    let report = completed(engine.trigger().await.unwrap());
    assert_eq!(report, DrainReport::default());
}

#[tokio::test]
async fn test_one_failing_row_does_not_abort_batch() {
    let store = InMemoryOutboxStore::new();
    let good_before = sms_task("+51999999991", "111111");
    let bad = sms_task("+51888888888", "222222");
    let good_after = sms_task("+51999999993", "333333");
    for task in [&good_before, &bad, &good_after] {
        store.insert_task(task.clone()).await;
    }

    let sms = Arc::new(RecordingSender::new().failing_for("+51888888888"));
    let engine = engine(&store, Dispatcher::new().register(OtpChannel::Sms, sms.clone()), DrainEngineConfig::default());

    let report = completed(engine.trigger().await.unwrap());
    assert_eq!(report.sent, 2);
    assert_eq!(report.failed, 1);

    let failed = store.task(bad.id).await.unwrap();
    assert_eq!(failed.status, DeliveryStatus::Failed);
    assert!(failed.last_error.unwrap().contains("rejected +51888888888"));
    assert_eq!(store.task(good_before.id).await.unwrap().status, DeliveryStatus::Sent);
    assert_eq!(store.task(good_after.id).await.unwrap().status, DeliveryStatus::Sent);
}

#[tokio::test]
async fn test_long_error_is_truncated() {
    let store = InMemoryOutboxStore::new();
    let task = sms_task("+51999999999", "482913");
    store.insert_task(task.clone()).await;

    let long_message = "e".repeat(2000);
    let dispatcher = Dispatcher::new().register(OtpChannel::Sms, Arc::new(FailingSender::new(&long_message)));
    let engine = engine(&store, dispatcher, DrainEngineConfig::default());

    completed(engine.trigger().await.unwrap());

    let stored = store.task(task.id).await.unwrap();
    assert_eq!(stored.status, DeliveryStatus::Failed);
    assert_eq!(stored.last_error.unwrap().chars().count(), MAX_ERROR_LENGTH);
}

#[tokio::test]
async fn test_corrupt_payload_and_unknown_channel_fail() {
    let store = InMemoryOutboxStore::new();
    let mut corrupt = sms_task("+51999999991", "111111");
    corrupt.payload = String::from("{\"channel\":\"PIGEON\"}");
    let record = VerificationRecord::create("+51999999992", "hash", OtpPurpose::Login);
    let whatsapp = DeliveryTask::create_send_task(&record, "222222", OtpChannel::Whatsapp, OtpPurpose::Login).unwrap();
    let good = sms_task("+51999999993", "333333");
    for task in [&corrupt, &whatsapp, &good] {
        store.insert_task(task.clone()).await;
    }

    let sms = Arc::new(RecordingSender::new());
    let engine = engine(
        &store,
        Dispatcher::new().register(OtpChannel::Sms, sms.clone()),
        DrainEngineConfig { max_attempts: 3, ..DrainEngineConfig::default() },
    );

    let report = completed(engine.trigger().await.unwrap());
    assert_eq!(report.failed, 2);
    assert_eq!(report.requeued, 0);
    assert_eq!(report.sent, 1);

    let corrupt = store.task(corrupt.id).await.unwrap();
    assert_eq!(corrupt.status, DeliveryStatus::Failed);
    assert!(corrupt.last_error.unwrap().starts_with("Corrupt payload"));

    let whatsapp = store.task(whatsapp.id).await.unwrap();
    assert_eq!(whatsapp.status, DeliveryStatus::Failed);
    assert!(whatsapp.last_error.unwrap().contains("WHATSAPP"));

    assert_eq!(sms.sent().await.len(), 1);
}

#[tokio::test]
async fn test_overlapping_trigger_is_skipped() {
    let store = InMemoryOutboxStore::new();
    store.insert_task(sms_task("+51999999999", "482913")).await;

    let sender = Arc::new(BlockingSender::new());
    let engine = engine(&store, Dispatcher::new().register(OtpChannel::Sms, sender.clone()), DrainEngineConfig::default());

    let first = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.trigger().await })
    };
    sender.wait_started().await;
    assert!(engine.is_running());

    assert_eq!(engine.trigger().await.unwrap(), RunOutcome::Skipped);

    sender.release();
    let report = completed(first.await.unwrap().unwrap());
    assert_eq!(report.sent, 1);
    assert!(!engine.is_running());
    assert_eq!(engine.stats().await.runs_skipped, 1);
}

#[tokio::test]
async fn test_claim_failure_fails_run_and_releases_flag() {
    let store = InMemoryOutboxStore::new();
    let task = sms_task("+51999999999", "482913");
    store.insert_task(task.clone()).await;
    let engine = engine(
        &store,
        Dispatcher::new().register(OtpChannel::Sms, Arc::new(RecordingSender::new())),
        DrainEngineConfig::default(),
    );

    store.set_fail_claims(true);
    assert!(engine.trigger().await.is_err());
    assert_eq!(store.task(task.id).await.unwrap().status, DeliveryStatus::Pending);
    assert!(!engine.is_running());

    store.set_fail_claims(false);
    let report = completed(engine.trigger().await.unwrap());
    assert_eq!(report.sent, 1);

    let stats = engine.stats().await;
    assert_eq!(stats.runs_failed, 1);
    assert!(stats.last_error.is_some());
}

#[tokio::test]
async fn test_retry_policy_requeues_until_attempts_exhausted() {
    let store = InMemoryOutboxStore::new();
    let task = sms_task("+51999999999", "482913");
    store.insert_task(task.clone()).await;

    let sender = Arc::new(FailingSender::new("provider busy"));
    let engine = engine(
        &store,
        Dispatcher::new().register(OtpChannel::Sms, sender.clone()),
        DrainEngineConfig { max_attempts: 2, ..DrainEngineConfig::default() },
    );

    let first = completed(engine.trigger().await.unwrap());
    assert_eq!(first.requeued, 1);
    let stored = store.task(task.id).await.unwrap();
    assert_eq!(stored.status, DeliveryStatus::Pending);
    assert_eq!(stored.attempts, 1);
    assert_eq!(stored.parse_payload().unwrap().otp, "482913");

    let second = completed(engine.trigger().await.unwrap());
    assert_eq!(second.failed, 1);
    let stored = store.task(task.id).await.unwrap();
    assert_eq!(stored.status, DeliveryStatus::Failed);
    assert_eq!(stored.attempts, 2);
    assert_eq!(sender.calls(), 2);

    let third = completed(engine.trigger().await.unwrap());
    assert_eq!(third.claimed, 0);
}

#[tokio::test]
async fn test_store_errors_are_counted_not_fatal() {
    let store = InMemoryOutboxStore::new();
    let task = sms_task("+51999999999", "482913");
    store.insert_task(task.clone()).await;
    let engine = engine(
        &store,
        Dispatcher::new().register(OtpChannel::Sms, Arc::new(RecordingSender::new())),
        DrainEngineConfig::default(),
    );

    store.set_fail_updates(true);
    let report = completed(engine.trigger().await.unwrap());
    assert_eq!(report.store_errors, 1);
    assert!(!report.is_clean());
    assert_eq!(store.task(task.id).await.unwrap().status, DeliveryStatus::Processing);
}

#[tokio::test]
async fn test_background_task_drains_and_stops() {
    let store = InMemoryOutboxStore::new();
    let task = sms_task("+51999999999", "482913");
    store.insert_task(task.clone()).await;

    let engine = engine(
        &store,
        Dispatcher::new().register(OtpChannel::Sms, Arc::new(RecordingSender::new())),
        DrainEngineConfig { interval: Duration::from_millis(20), ..DrainEngineConfig::default() },
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = Arc::clone(&engine).start_background_task(shutdown_rx).unwrap();

    for _ in 0..100 {
        if store.task(task.id).await.unwrap().status == DeliveryStatus::Sent {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(store.task(task.id).await.unwrap().status, DeliveryStatus::Sent);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_run() {
    let store = InMemoryOutboxStore::new();
    let task = sms_task("+51999999999", "482913");
    store.insert_task(task.clone()).await;

    let sender = Arc::new(BlockingSender::new());
    let engine = engine(
        &store,
        Dispatcher::new().register(OtpChannel::Sms, sender.clone()),
        DrainEngineConfig { interval: Duration::from_millis(20), ..DrainEngineConfig::default() },
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = Arc::clone(&engine).start_background_task(shutdown_rx).unwrap();

    sender.wait_started().await;
    shutdown_tx.send(true).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!handle.is_finished());
    assert_eq!(store.task(task.id).await.unwrap().status, DeliveryStatus::Processing);

    sender.release();
    tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    assert_eq!(store.task(task.id).await.unwrap().status, DeliveryStatus::Sent);
    assert!(!engine.is_running());
}

#[tokio::test]
async fn test_disabled_engine_does_not_start() {
    let store = InMemoryOutboxStore::new();
    let engine = engine(
        &store,
        Dispatcher::new(),
        DrainEngineConfig { enabled: false, ..DrainEngineConfig::default() },
    );
    let (_tx, rx) = watch::channel(false);
    assert!(engine.start_background_task(rx).is_none());
}

#[tokio::test]
async fn test_issued_sms_login_code_is_delivered_once() {
    let store = InMemoryOutboxStore::new();
    let otp_service = OtpService::new(
        Arc::new(store.clone()),
        Arc::new(SecureCodeGenerator),
        Arc::new(BcryptCodeHasher::new(4)),
        Arc::new(TokenIssuer::new(TokenIssuerConfig::default())),
    );
    let issued = otp_service
        .issue(OtpIssueRequest {
            target: "+51999999999".to_string(),
            channel: OtpChannel::Sms,
            purpose: OtpPurpose::Login,
        })
        .await
        .unwrap();

    let record = store.record(issued.reference_id).await.unwrap();
    assert_eq!(record.expires_at - record.created_at, chrono::Duration::seconds(180));

    let pending = store.tasks().await.remove(0);
    let code = pending.parse_payload().unwrap().otp;
    assert_eq!(
        pending.payload,
        format!(r#"{{"channel":"SMS","target":"+51999999999","otp":"{}","purpose":"LOGIN"}}"#, code)
    );

    let sms = Arc::new(RecordingSender::new());
    let engine = engine(&store, Dispatcher::new().register(OtpChannel::Sms, sms.clone()), DrainEngineConfig::default());
    completed(engine.trigger().await.unwrap());
    completed(engine.trigger().await.unwrap());

    let sent = sms.sent().await;
    assert_eq!(sent, vec![(OtpChannel::Sms, "+51999999999".to_string(), code, OtpPurpose::Login)]);
    assert_eq!(store.task(pending.id).await.unwrap().status, DeliveryStatus::Sent);
}
