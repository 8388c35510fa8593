//! Notification copy for each purpose

use crate::domain::entities::OtpPurpose;

const BRAND: &str = "Keygate";

fn purpose_phrase(purpose: OtpPurpose) -> &'static str {
    match purpose {
        OtpPurpose::Register => "confirm your registration",
        OtpPurpose::Login => "sign in",
        OtpPurpose::PasswordReset => "reset your password",
        OtpPurpose::MfaSetup => "set up two-step verification",
    }
}

/// SMS / WhatsApp text
pub fn text_message(code: &str, purpose: OtpPurpose) -> String {
    format!(
        "Your {} code to {} is: {}. It expires in {} minutes. Do not share it with anyone.",
        BRAND,
        purpose_phrase(purpose),
        code,
        purpose.ttl_minutes()
    )
}

pub fn email_subject(purpose: OtpPurpose) -> &'static str {
    match purpose {
        OtpPurpose::Register => "Confirm your registration",
        OtpPurpose::Login => "Your sign-in code",
        OtpPurpose::PasswordReset => "Reset your password",
        OtpPurpose::MfaSetup => "Two-step verification setup",
    }
}

/// Minimal HTML body; the expiry comes from the same TTL that sets `expires_at`
pub fn email_body(code: &str, purpose: OtpPurpose) -> String {
    format!(
        "<p>Use the code below to {}.</p>\
         <p style=\"font-size:24px;font-weight:bold;letter-spacing:4px\">{}</p>\
         <p>This code expires in {} minutes. If you did not request it, ignore this email.</p>",
        purpose_phrase(purpose),
        code,
        purpose.ttl_minutes()
    )
}
