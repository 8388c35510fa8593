//! Unit tests for the OTP service

use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{DeliveryStatus, OtpChannel, OtpPurpose};
use crate::errors::DomainError;
use crate::repositories::{InMemoryOutboxStore, OtpRepository};
use crate::services::otp::{
    BcryptCodeHasher, CodeGenerator, OtpIssueRequest, OtpService, OtpValidateRequest,
};
use crate::services::token::{TokenIssuer, TokenIssuerConfig};

/// Generator returning a fixed code
struct FixedCodeGenerator(&'static str);

impl CodeGenerator for FixedCodeGenerator {
    fn generate(&self) -> String {
        self.0.to_string()
    }
}

fn service(store: &InMemoryOutboxStore, code: &'static str) -> (OtpService<InMemoryOutboxStore>, Arc<TokenIssuer>) {
    let issuer = Arc::new(TokenIssuer::new(TokenIssuerConfig::default()));
    let service = OtpService::new(
        Arc::new(store.clone()),
        Arc::new(FixedCodeGenerator(code)),
        Arc::new(BcryptCodeHasher::new(4)),
        Arc::clone(&issuer),
    );
    (service, issuer)
}

fn sms_login(target: &str) -> OtpIssueRequest {
    OtpIssueRequest {
        target: target.to_string(),
        channel: OtpChannel::Sms,
        purpose: OtpPurpose::Login,
    }
}

#[tokio::test]
async fn test_issue_writes_record_and_task_together() {
    let store = InMemoryOutboxStore::new();
    let (service, _) = service(&store, "482913");

    let before = Utc::now();
    let issued = service.issue(sms_login("+51 999 999 999")).await.unwrap();

    let record = store.record(issued.reference_id).await.unwrap();
    assert_eq!(record.target, "+51999999999");
    assert_ne!(record.code_hash, "482913");
    assert!(!record.used);
    assert!(issued.expires_at >= before + Duration::seconds(180));
    assert!(issued.expires_at <= Utc::now() + Duration::seconds(180));

    let tasks = store.tasks().await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].aggregate_id, issued.reference_id);
    assert_eq!(tasks[0].status, DeliveryStatus::Pending);
    assert_eq!(
        tasks[0].payload,
        r#"{"channel":"SMS","target":"+51999999999","otp":"482913","purpose":"LOGIN"}"#
    );
}

#[tokio::test]
async fn test_issue_rejects_target_not_matching_channel() {
    let store = InMemoryOutboxStore::new();
    let (service, _) = service(&store, "482913");

    let err = service.issue(sms_login("jane@example.com")).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));

    let err = service
        .issue(OtpIssueRequest {
            target: "+51999999999".to_string(),
            channel: OtpChannel::Email,
            purpose: OtpPurpose::Register,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));

    // Letters are not formatting; the number must not be rewritten into another one
    let err = service.issue(sms_login("+51abc999999999")).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));
    assert!(store.tasks().await.is_empty());
}

#[tokio::test]
async fn test_validate_consumes_once_and_issues_token() {
    let store = InMemoryOutboxStore::new();
    let (service, issuer) = service(&store, "482913");
    let issued = service.issue(sms_login("+51999999999")).await.unwrap();

    let request = OtpValidateRequest {
        reference_id: issued.reference_id,
        purpose: OtpPurpose::Login,
        code: "482913".to_string(),
    };

    let validated = service.validate(request.clone()).await.unwrap();
    assert_eq!(validated.target, "+51999999999");
    assert!(issuer.validate(&validated.token, "+51999999999"));

    let err = service.validate(request).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidOtp));
}

#[tokio::test]
async fn test_validate_fails_closed() {
    let store = InMemoryOutboxStore::new();
    let (service, _) = service(&store, "482913");
    let issued = service.issue(sms_login("+51999999999")).await.unwrap();

    let attempts = [
        (issued.reference_id, OtpPurpose::Login, "000000"),
        (issued.reference_id, OtpPurpose::Register, "482913"),
        (issued.reference_id, OtpPurpose::Login, "48291"),
        (issued.reference_id, OtpPurpose::Login, "48291a"),
        (Uuid::new_v4(), OtpPurpose::Login, "482913"),
    ];

    for (reference_id, purpose, code) in attempts {
        let err = service
            .validate(OtpValidateRequest {
                reference_id,
                purpose,
                code: code.to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidOtp), "{} accepted", code);
    }

    // The record is still usable after rejected attempts.
    assert!(store.find_active(issued.reference_id, OtpPurpose::Login).await.unwrap().is_some());
}

#[tokio::test]
async fn test_validate_rejects_expired_record() {
    use crate::domain::entities::{DeliveryTask, VerificationRecord};

    let store = InMemoryOutboxStore::new();
    let (service, _) = service(&store, "482913");

    let hasher = BcryptCodeHasher::new(4);
    let digest = crate::services::otp::CodeHasher::hash(&hasher, "482913").unwrap();
    let record = VerificationRecord::create_at(
        "+51999999999",
        digest,
        OtpPurpose::Login,
        Utc::now() - Duration::seconds(181),
    );
    let task = DeliveryTask::create_send_task(&record, "482913", OtpChannel::Sms, OtpPurpose::Login).unwrap();
    store.save_with_task(&record, &task).await.unwrap();

    let err = service
        .validate(OtpValidateRequest {
            reference_id: record.id,
            purpose: OtpPurpose::Login,
            code: "482913".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidOtp));
}
