//! Domain entities representing core business objects.

pub mod delivery_task;
pub mod verification_record;

// Re-export commonly used types
pub use delivery_task::{
    truncate_error, DeliveryPayload, DeliveryStatus, DeliveryTask, OtpChannel,
    AGGREGATE_TYPE_OTP, EVENT_TYPE_SEND_OTP, MAX_ERROR_LENGTH, REDACTED_OTP,
};
pub use verification_record::{OtpPurpose, VerificationRecord};
