//! OTP service implementation

use chrono::Utc;
use std::sync::Arc;

use kg_shared::utils::{is_e164, is_email, mask_target, normalize_phone_number};

use crate::domain::entities::{DeliveryTask, OtpChannel, VerificationRecord};
use crate::errors::{DomainError, DomainResult};
use crate::repositories::OtpRepository;
use crate::services::token::TokenIssuer;

use super::generator::{CodeGenerator, CODE_LENGTH};
use super::hasher::CodeHasher;
use super::types::{IssuedOtp, OtpIssueRequest, OtpValidateRequest, ValidatedOtp};

/// Issues codes into the outbox and validates them back
pub struct OtpService<R: OtpRepository> {
    repository: Arc<R>,
    generator: Arc<dyn CodeGenerator>,
    hasher: Arc<dyn CodeHasher>,
    token_issuer: Arc<TokenIssuer>,
}

impl<R: OtpRepository> OtpService<R> {
    pub fn new(
        repository: Arc<R>,
        generator: Arc<dyn CodeGenerator>,
        hasher: Arc<dyn CodeHasher>,
        token_issuer: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            repository,
            generator,
            hasher,
            token_issuer,
        }
    }

    /// Issue a code for a target
    ///
    /// This method:
    /// 1. Validates the target against the channel
    /// 2. Generates and hashes a new code
    /// 3. Writes the verification record and its delivery task atomically
    ///
    /// Nothing is sent here; the outbox drain delivers the task.
    ///
    /// # Returns
    ///
    /// * `Ok(IssuedOtp)` - Reference id and expiry, never the code
    /// * `Err(DomainError::Validation)` - Target does not fit the channel
    /// * `Err(DomainError::Storage)` - The atomic write failed; nothing was stored
    pub async fn issue(&self, request: OtpIssueRequest) -> DomainResult<IssuedOtp> {
        let target = Self::normalize_target(&request.target, request.channel)?;

        let code = self.generator.generate();
        let code_hash = self.hash_code(&code).await?;

        let record = VerificationRecord::create(target.as_str(), code_hash, request.purpose);
        let task = DeliveryTask::create_send_task(&record, &code, request.channel, request.purpose)
            .map_err(|e| DomainError::internal(format!("Failed to serialize delivery payload: {}", e)))?;

        self.repository.save_with_task(&record, &task).await.map_err(|e| {
            tracing::error!(
                recipient = %mask_target(&target),
                error = %e,
                event = "otp_storage_failed",
                "Failed to store verification record"
            );
            e
        })?;

        tracing::info!(
            recipient = %mask_target(&target),
            channel = %request.channel,
            purpose = %request.purpose,
            reference_id = %record.id,
            task_id = %task.id,
            event = "otp_issued",
            "Issued verification code"
        );

        Ok(IssuedOtp {
            reference_id: record.id,
            expires_at: record.expires_at,
        })
    }

    /// Validate a code and consume its record
    ///
    /// Every rejection (bad format, unknown reference, wrong purpose, used,
    /// expired, mismatch, lost race) is `DomainError::InvalidOtp`. Storage
    /// failures propagate as they are.
    pub async fn validate(&self, request: OtpValidateRequest) -> DomainResult<ValidatedOtp> {
        if request.code.len() != CODE_LENGTH || !request.code.chars().all(|c| c.is_ascii_digit()) {
            return Err(self.reject(&request, "malformed_code"));
        }

        let record = match self.repository.find_active(request.reference_id, request.purpose).await? {
            Some(record) => record,
            None => return Err(self.reject(&request, "not_found")),
        };

        if record.is_expired_at(Utc::now()) {
            return Err(self.reject(&request, "expired"));
        }

        if !self.verify_code(&request.code, &record.code_hash).await? {
            return Err(self.reject(&request, "mismatch"));
        }

        if !self.repository.mark_used(record.id).await? {
            return Err(self.reject(&request, "already_used"));
        }

        let issued = self.token_issuer.generate(&record.target, record.purpose)?;

        tracing::info!(
            recipient = %mask_target(&record.target),
            purpose = %record.purpose,
            reference_id = %record.id,
            event = "otp_validated",
            "Verification code accepted"
        );

        Ok(ValidatedOtp {
            target: record.target,
            token: issued.token,
            token_expires_at: issued.expires_at,
        })
    }

    fn normalize_target(target: &str, channel: OtpChannel) -> DomainResult<String> {
        let target = target.trim();
        if channel.is_phone() {
            if !is_e164(target) {
                return Err(DomainError::validation(format!(
                    "{} target must be an E.164 phone number",
                    channel
                )));
            }
            Ok(normalize_phone_number(target))
        } else {
            if !is_email(target) {
                return Err(DomainError::validation("EMAIL target must be an email address"));
            }
            Ok(target.to_string())
        }
    }

    // bcrypt is CPU-bound; keep it off the async workers.
    async fn hash_code(&self, code: &str) -> DomainResult<String> {
        let hasher = Arc::clone(&self.hasher);
        let code = code.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&code))
            .await
            .map_err(|e| DomainError::internal(format!("Hashing task failed: {}", e)))?
    }

    async fn verify_code(&self, code: &str, digest: &str) -> DomainResult<bool> {
        let hasher = Arc::clone(&self.hasher);
        let code = code.to_string();
        let digest = digest.to_string();
        tokio::task::spawn_blocking(move || hasher.matches(&code, &digest))
            .await
            .map_err(|e| DomainError::internal(format!("Hash verification task failed: {}", e)))
    }

    fn reject(&self, request: &OtpValidateRequest, reason: &'static str) -> DomainError {
        tracing::warn!(
            reference_id = %request.reference_id,
            purpose = %request.purpose,
            reason = reason,
            event = "otp_rejected",
            "Verification code rejected"
        );
        DomainError::InvalidOtp
    }
}
