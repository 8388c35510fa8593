//! In-process senders for tests

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

use crate::domain::entities::{OtpChannel, OtpPurpose};
use crate::errors::DeliveryError;

use super::sender::{ChannelSender, DEFAULT_SEND_TIMEOUT};

pub(crate) type SentMessage = (OtpChannel, String, String, OtpPurpose);

/// Records every send; fails for configured targets
#[derive(Default)]
pub(crate) struct RecordingSender {
    sent: Mutex<Vec<SentMessage>>,
    failing_targets: HashSet<String>,
}

impl RecordingSender {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_for(mut self, target: &str) -> Self {
        self.failing_targets.insert(target.to_string());
        self
    }

    pub(crate) async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl ChannelSender for RecordingSender {
    async fn send(&self, channel: OtpChannel, target: &str, code: &str, purpose: OtpPurpose) -> Result<(), DeliveryError> {
        if self.failing_targets.contains(target) {
            return Err(DeliveryError::provider("recording", format!("rejected {}", target)));
        }
        self.sent
            .lock()
            .await
            .push((channel, target.to_string(), code.to_string(), purpose));
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "recording"
    }
}

/// Always fails with the same message
pub(crate) struct FailingSender {
    message: String,
    calls: AtomicUsize,
}

impl FailingSender {
    pub(crate) fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelSender for FailingSender {
    async fn send(&self, _: OtpChannel, _: &str, _: &str, _: OtpPurpose) -> Result<(), DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DeliveryError::provider("failing", self.message.clone()))
    }

    fn provider_name(&self) -> &str {
        "failing"
    }
}

/// Blocks every send until released
pub(crate) struct BlockingSender {
    release: Notify,
    started: Notify,
    timeout: Duration,
}

impl BlockingSender {
    pub(crate) fn new() -> Self {
        Self {
            release: Notify::new(),
            started: Notify::new(),
            timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolves once a send is in progress
    pub(crate) async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub(crate) fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl ChannelSender for BlockingSender {
    async fn send(&self, _: OtpChannel, _: &str, _: &str, _: OtpPurpose) -> Result<(), DeliveryError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "blocking"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
