//! Business services containing domain logic and use cases.

pub mod delivery;
pub mod otp;
pub mod outbox;
pub mod token;

// Re-export commonly used types
pub use delivery::{ChannelSender, Dispatcher};
pub use otp::{
    BcryptCodeHasher, CodeGenerator, CodeHasher, IssuedOtp, OtpIssueRequest, OtpService,
    OtpValidateRequest, SecureCodeGenerator, ValidatedOtp,
};
pub use outbox::{DrainEngineConfig, DrainReport, DrainStats, OutboxDrainEngine, RunOutcome};
pub use token::{TokenIssuer, TokenIssuerConfig};
