//! Delivery task entity: the outbox row that carries a code to its channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::verification_record::{OtpPurpose, VerificationRecord};

/// Aggregate type of every OTP delivery task
pub const AGGREGATE_TYPE_OTP: &str = "OTP";

/// Event type of every OTP delivery task
pub const EVENT_TYPE_SEND_OTP: &str = "SEND_OTP";

/// Upper bound (in characters) of a stored failure message
pub const MAX_ERROR_LENGTH: usize = 500;

/// Replacement for the code once a task is terminal
pub const REDACTED_OTP: &str = "******";

/// Outbound channel a code is delivered through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OtpChannel {
    Email,
    Sms,
    Whatsapp,
}

impl OtpChannel {
    pub const ALL: [OtpChannel; 3] = [OtpChannel::Email, OtpChannel::Sms, OtpChannel::Whatsapp];

    pub fn as_str(&self) -> &'static str {
        match self {
            OtpChannel::Email => "EMAIL",
            OtpChannel::Sms => "SMS",
            OtpChannel::Whatsapp => "WHATSAPP",
        }
    }

    /// Whether the channel addresses a phone number rather than an email
    pub fn is_phone(&self) -> bool {
        matches!(self, OtpChannel::Sms | OtpChannel::Whatsapp)
    }
}

impl std::fmt::Display for OtpChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OtpChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OtpChannel::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Unknown OTP channel: {}", s))
    }
}

/// Lifecycle of a delivery task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    /// Waiting to be claimed
    Pending,
    /// Claimed by a drain run; delivery in progress or interrupted
    Processing,
    /// Delivered
    Sent,
    /// Given up
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "PENDING",
            DeliveryStatus::Processing => "PROCESSING",
            DeliveryStatus::Sent => "SENT",
            DeliveryStatus::Failed => "FAILED",
        }
    }

    /// SENT and FAILED are never left
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Sent | DeliveryStatus::Failed)
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(DeliveryStatus::Pending),
            "PROCESSING" => Ok(DeliveryStatus::Processing),
            "SENT" => Ok(DeliveryStatus::Sent),
            "FAILED" => Ok(DeliveryStatus::Failed),
            _ => Err(format!("Unknown delivery status: {}", s)),
        }
    }
}

/// Serialized body of a delivery task.
///
/// Field order is the wire key order: `channel`, `target`, `otp`, `purpose`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPayload {
    pub channel: OtpChannel,
    pub target: String,
    pub otp: String,
    pub purpose: OtpPurpose,
}

impl DeliveryPayload {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Copy of the payload with the code replaced by [`REDACTED_OTP`]
    pub fn redacted(&self) -> Self {
        Self {
            otp: REDACTED_OTP.to_string(),
            ..self.clone()
        }
    }
}

/// A durable intent to deliver one code through one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTask {
    pub id: Uuid,
    pub aggregate_type: String,
    /// Reference id of the owning verification record
    pub aggregate_id: Uuid,
    pub event_type: String,
    /// JSON body, see [`DeliveryPayload`]
    pub payload: String,
    pub status: DeliveryStatus,
    /// Number of times the task has been claimed
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub terminal_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl DeliveryTask {
    /// Builds the SEND_OTP task for a freshly created record
    ///
    /// # Errors
    /// Fails only if the payload cannot be serialized.
    pub fn create_send_task(
        record: &VerificationRecord,
        plaintext_code: &str,
        channel: OtpChannel,
        purpose: OtpPurpose,
    ) -> Result<Self, serde_json::Error> {
        let payload = DeliveryPayload {
            channel,
            target: record.target.clone(),
            otp: plaintext_code.to_string(),
            purpose,
        };

        Ok(Self {
            id: Uuid::new_v4(),
            aggregate_type: AGGREGATE_TYPE_OTP.to_string(),
            aggregate_id: record.id,
            event_type: EVENT_TYPE_SEND_OTP.to_string(),
            payload: payload.to_json()?,
            status: DeliveryStatus::Pending,
            attempts: 0,
            created_at: Utc::now(),
            terminal_at: None,
            last_error: None,
        })
    }

    pub fn parse_payload(&self) -> Result<DeliveryPayload, serde_json::Error> {
        DeliveryPayload::from_json(&self.payload)
    }

    /// PENDING -> PROCESSING, counting the attempt
    pub fn mark_processing(&mut self) -> bool {
        if self.status != DeliveryStatus::Pending {
            return false;
        }
        self.status = DeliveryStatus::Processing;
        self.attempts += 1;
        true
    }

    /// PROCESSING -> SENT
    pub fn mark_sent(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != DeliveryStatus::Processing {
            return false;
        }
        self.status = DeliveryStatus::Sent;
        self.terminal_at = Some(now);
        self.redact();
        true
    }

    /// PROCESSING -> FAILED with a bounded error message
    pub fn mark_failed(&mut self, error: &str, now: DateTime<Utc>) -> bool {
        if self.status != DeliveryStatus::Processing {
            return false;
        }
        self.status = DeliveryStatus::Failed;
        self.terminal_at = Some(now);
        self.last_error = Some(truncate_error(error));
        self.redact();
        true
    }

    /// PROCESSING -> PENDING, keeping the code for the next attempt
    pub fn requeue(&mut self, error: &str) -> bool {
        if self.status != DeliveryStatus::Processing {
            return false;
        }
        self.status = DeliveryStatus::Pending;
        self.last_error = Some(truncate_error(error));
        true
    }

    // Unparsable payloads are left as they are.
    fn redact(&mut self) {
        if let Ok(redacted) = self.parse_payload().and_then(|p| p.redacted().to_json()) {
            self.payload = redacted;
        }
    }
}

/// Bounds an error message to [`MAX_ERROR_LENGTH`] characters
pub fn truncate_error(message: &str) -> String {
    if message.trim().is_empty() {
        return String::from("Unknown error");
    }
    match message.char_indices().nth(MAX_ERROR_LENGTH) {
        Some((idx, _)) => message[..idx].to_string(),
        None => message.to_string(),
    }
}
