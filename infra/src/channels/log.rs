//! Log-only sender for development

use async_trait::async_trait;
use tracing::info;

use kg_core::domain::entities::{OtpChannel, OtpPurpose};
use kg_core::errors::DeliveryError;
use kg_shared::utils::mask_target;

/// Accepts every delivery and only logs it; the code itself is never logged
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSender;

impl LogSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl kg_core::services::delivery::ChannelSender for LogSender {
    async fn send(
        &self,
        channel: OtpChannel,
        target: &str,
        _code: &str,
        purpose: OtpPurpose,
    ) -> Result<(), DeliveryError> {
        info!(
            channel = %channel,
            recipient = %mask_target(target),
            purpose = %purpose,
            event = "otp_logged",
            "Log sender accepted verification code"
        );
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "log"
    }
}
