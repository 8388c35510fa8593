//! OTP issuance and validation
//!
//! Issuance generates a code, hashes it, and writes the verification record
//! together with its SEND_OTP delivery task. The code itself only travels in
//! the task payload; delivery happens later through the outbox drain.

mod generator;
mod hasher;
mod service;
mod types;

#[cfg(test)]
mod tests;

pub use generator::{CodeGenerator, SecureCodeGenerator, CODE_LENGTH};
pub use hasher::{BcryptCodeHasher, CodeHasher};
pub use service::OtpService;
pub use types::{IssuedOtp, OtpIssueRequest, OtpValidateRequest, ValidatedOtp};
