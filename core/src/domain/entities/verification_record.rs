//! Verification record entity: the hashed, purpose-bound side of an issued OTP.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::otp::CodeHasher;

/// Why a one-time passcode was issued.
///
/// Each purpose carries its own validity window; [`OtpPurpose::ttl`] is the
/// single source for both record expiry and the expiry text shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OtpPurpose {
    Register,
    Login,
    PasswordReset,
    MfaSetup,
}

impl OtpPurpose {
    /// Every purpose, in declaration order
    pub const ALL: [OtpPurpose; 4] = [
        OtpPurpose::Register,
        OtpPurpose::Login,
        OtpPurpose::PasswordReset,
        OtpPurpose::MfaSetup,
    ];

    /// Validity window of a code issued for this purpose
    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.ttl_seconds())
    }

    /// Validity window in seconds
    pub fn ttl_seconds(&self) -> i64 {
        match self {
            OtpPurpose::Register => 300,
            OtpPurpose::Login => 180,
            OtpPurpose::PasswordReset => 600,
            OtpPurpose::MfaSetup => 900,
        }
    }

    /// Validity window in whole minutes, for user-facing copy
    pub fn ttl_minutes(&self) -> i64 {
        self.ttl_seconds() / 60
    }

    /// Wire name of the purpose (`"PASSWORD_RESET"`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Register => "REGISTER",
            OtpPurpose::Login => "LOGIN",
            OtpPurpose::PasswordReset => "PASSWORD_RESET",
            OtpPurpose::MfaSetup => "MFA_SETUP",
        }
    }
}

impl std::fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OtpPurpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OtpPurpose::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("Unknown OTP purpose: {}", s))
    }
}

/// A hashed one-time passcode bound to a target and a purpose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    /// Opaque reference handed back to the caller
    pub id: Uuid,

    /// What the code proves
    pub purpose: OtpPurpose,

    /// Phone number (E.164) or email address the code was issued for
    pub target: String,

    /// One-way hash of the code; the plaintext is never stored here
    pub code_hash: String,

    /// Timestamp after which the code no longer validates
    pub expires_at: DateTime<Utc>,

    /// Whether the code has been consumed
    pub used: bool,

    /// Timestamp when the record was created
    pub created_at: DateTime<Utc>,
}

impl VerificationRecord {
    /// Creates a new unused record whose expiry follows the purpose's TTL
    pub fn create(target: impl Into<String>, code_hash: impl Into<String>, purpose: OtpPurpose) -> Self {
        Self::create_at(target, code_hash, purpose, Utc::now())
    }

    /// Same as [`VerificationRecord::create`] with an explicit creation instant
    pub fn create_at(
        target: impl Into<String>,
        code_hash: impl Into<String>,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            purpose,
            target: target.into(),
            code_hash: code_hash.into(),
            expires_at: now + purpose.ttl(),
            used: false,
            created_at: now,
        }
    }

    /// Checks if the record has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Checks expiry against a given instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// A record can still be consumed when it is unused and unexpired
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired_at(now)
    }

    /// Verifies a raw code against the stored hash
    pub fn matches<H: CodeHasher + ?Sized>(&self, raw_code: &str, hasher: &H) -> bool {
        hasher.matches(raw_code, &self.code_hash)
    }

    /// Marks the record as used.
    ///
    /// Returns `false` without changing anything when it was already used;
    /// `used` never goes back to `false`.
    pub fn mark_as_used(&mut self) -> bool {
        if self.used {
            return false;
        }
        self.used = true;
        true
    }
}
