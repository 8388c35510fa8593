//! Request and result types of the OTP service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{OtpChannel, OtpPurpose};

/// Request to issue a code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpIssueRequest {
    /// E.164 phone number for SMS/WhatsApp, email address for EMAIL
    pub target: String,
    pub channel: OtpChannel,
    pub purpose: OtpPurpose,
}

/// Result of issuing a code; never contains the code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedOtp {
    /// Reference the caller presents back on validation
    pub reference_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Request to validate a code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpValidateRequest {
    pub reference_id: Uuid,
    pub purpose: OtpPurpose,
    pub code: String,
}

/// Result of a successful validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedOtp {
    pub target: String,
    /// Flow token proving the target was verified for this purpose
    pub token: String,
    pub token_expires_at: DateTime<Utc>,
}
