//! Unit tests for the in-memory outbox store

use std::collections::HashSet;

use chrono::{Duration, Utc};

use crate::domain::entities::{DeliveryStatus, DeliveryTask, OtpChannel, OtpPurpose, VerificationRecord, REDACTED_OTP};
use crate::repositories::{DeliveryQueue, InMemoryOutboxStore, OtpRepository};

fn pending_task(offset_secs: i64) -> DeliveryTask {
    let record = VerificationRecord::create("+51999999999", "hash", OtpPurpose::Login);
    let mut task = DeliveryTask::create_send_task(&record, "123456", OtpChannel::Sms, OtpPurpose::Login).unwrap();
    task.created_at = Utc::now() + Duration::seconds(offset_secs);
    task
}

#[tokio::test]
async fn test_claim_respects_limit_and_age() {
    let store = InMemoryOutboxStore::new();
    let newest = pending_task(10);
    let oldest = pending_task(-10);
    store.insert_task(newest.clone()).await;
    store.insert_task(oldest.clone()).await;

    let claimed = store.claim_pending(1).await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].id, oldest.id);
    assert_eq!(claimed[0].status, DeliveryStatus::Processing);
    assert_eq!(claimed[0].attempts, 1);

    let stored = store.task(oldest.id).await.unwrap();
    assert_eq!(stored.status, DeliveryStatus::Processing);
}

#[tokio::test]
async fn test_concurrent_claims_never_overlap() {
    let store = InMemoryOutboxStore::new();
    for i in 0..50 {
        store.insert_task(pending_task(i)).await;
    }

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move { store.claim_pending(10).await.unwrap() }));
    }

    let mut seen = HashSet::new();
    let mut total = 0;
    for handle in handles {
        for task in handle.await.unwrap() {
            total += 1;
            assert!(seen.insert(task.id), "task {} claimed twice", task.id);
        }
    }
    assert_eq!(total, 50);
    assert!(store.claim_pending(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_updates_only_apply_to_processing_rows() {
    let store = InMemoryOutboxStore::new();
    let task = pending_task(0);
    store.insert_task(task.clone()).await;

    assert!(!store.mark_sent(task.id).await.unwrap());

    store.claim_pending(10).await.unwrap();
    assert!(store.mark_sent(task.id).await.unwrap());
    assert!(!store.mark_failed(task.id, "late").await.unwrap());

    let stored = store.task(task.id).await.unwrap();
    assert_eq!(stored.status, DeliveryStatus::Sent);
    assert_eq!(stored.parse_payload().unwrap().otp, REDACTED_OTP);
}

#[tokio::test]
async fn test_fail_switches() {
    let store = InMemoryOutboxStore::new();
    store.insert_task(pending_task(0)).await;

    store.set_fail_claims(true);
    assert!(store.claim_pending(10).await.is_err());
    store.set_fail_claims(false);

    let claimed = store.claim_pending(10).await.unwrap();
    store.set_fail_updates(true);
    assert!(store.mark_sent(claimed[0].id).await.is_err());
}

#[tokio::test]
async fn test_record_written_with_task_and_used_once() {
    let store = InMemoryOutboxStore::new();
    let record = VerificationRecord::create("jane@example.com", "hash", OtpPurpose::Register);
    let task = DeliveryTask::create_send_task(&record, "654321", OtpChannel::Email, OtpPurpose::Register).unwrap();

    store.save_with_task(&record, &task).await.unwrap();
    assert!(store.save_with_task(&record, &task).await.is_err());
    assert_eq!(store.tasks().await.len(), 1);

    assert!(store.find_active(record.id, OtpPurpose::Login).await.unwrap().is_none());
    assert!(store.find_active(record.id, OtpPurpose::Register).await.unwrap().is_some());

    assert!(store.mark_used(record.id).await.unwrap());
    assert!(!store.mark_used(record.id).await.unwrap());
    assert!(store.find_active(record.id, OtpPurpose::Register).await.unwrap().is_none());
}
