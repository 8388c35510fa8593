//! Routes a delivery to the sender registered for its channel

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::entities::{OtpChannel, OtpPurpose};
use crate::errors::DeliveryError;

use super::sender::ChannelSender;

/// Explicit channel -> sender registry
#[derive(Clone, Default)]
pub struct Dispatcher {
    senders: HashMap<OtpChannel, Arc<dyn ChannelSender>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sender` for `channel`, replacing any previous one
    pub fn register(mut self, channel: OtpChannel, sender: Arc<dyn ChannelSender>) -> Self {
        self.senders.insert(channel, sender);
        self
    }

    /// Registered channels, in a stable order
    pub fn channels(&self) -> Vec<OtpChannel> {
        OtpChannel::ALL
            .into_iter()
            .filter(|c| self.senders.contains_key(c))
            .collect()
    }

    /// Send through the channel's sender, bounded by the sender's timeout
    ///
    /// # Errors
    ///
    /// * `DeliveryError::UnsupportedChannel` - Nothing registered for `channel`
    /// * `DeliveryError::Timeout` - The sender did not finish in time
    /// * Whatever the sender itself returns
    pub async fn send(
        &self,
        channel: OtpChannel,
        target: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<(), DeliveryError> {
        let sender = self
            .senders
            .get(&channel)
            .ok_or_else(|| DeliveryError::UnsupportedChannel {
                channel: channel.to_string(),
            })?;

        let limit = sender.timeout();
        match tokio::time::timeout(limit, sender.send(channel, target, code, purpose)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout {
                provider: sender.provider_name().to_string(),
                seconds: limit.as_secs(),
            }),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("channels", &self.channels())
            .finish()
    }
}
