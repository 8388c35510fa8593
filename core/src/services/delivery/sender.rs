//! Channel sender port

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::entities::{OtpChannel, OtpPurpose};
use crate::errors::DeliveryError;

/// Upper bound of a single send when the sender does not set its own
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Delivers a code through one outbound channel
///
/// A sender may serve several channels (SMS and WhatsApp share one provider),
/// so the channel being delivered is passed in.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(
        &self,
        channel: OtpChannel,
        target: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<(), DeliveryError>;

    /// Name used in logs and errors
    fn provider_name(&self) -> &str;

    fn timeout(&self) -> Duration {
        DEFAULT_SEND_TIMEOUT
    }
}
