//! Twilio SMS and WhatsApp sender
//!
//! Talks to the Twilio Messages REST API directly with `reqwest`:
//! form-encoded POST, HTTP basic auth with the account SID and auth token.
//! WhatsApp uses the same endpoint with `whatsapp:`-prefixed addresses.
//! Rate limiting (429) and server errors (5xx) are retried with exponential
//! backoff; other client errors fail immediately.

use async_trait::async_trait;
use phonenumber::{Mode, PhoneNumber};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use kg_core::domain::entities::{OtpChannel, OtpPurpose};
use kg_core::errors::DeliveryError;
use kg_core::services::delivery::{text_message, ChannelSender};
use kg_shared::config::TwilioConfig;
use kg_shared::utils::mask_phone_number;

use crate::InfrastructureError;

const PROVIDER: &str = "twilio";
const WHATSAPP_PREFIX: &str = "whatsapp:";

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// Outcome of a single HTTP attempt
enum Attempt {
    Sent(String),
    Retry(String),
    Fatal(String),
}

/// Twilio-backed sender for the SMS and WhatsApp channels
pub struct TwilioSender {
    client: reqwest::Client,
    config: TwilioConfig,
    request_timeout: Duration,
}

impl TwilioSender {
    /// Create a new Twilio sender
    ///
    /// `request_timeout` bounds each HTTP attempt.
    pub fn new(config: TwilioConfig, request_timeout: Duration) -> Result<Self, InfrastructureError> {
        if config.account_sid.is_empty() || config.auth_token.is_empty() {
            return Err(InfrastructureError::Config(
                "TWILIO_ACCOUNT_SID and TWILIO_AUTH_TOKEN must be set".to_string(),
            ));
        }
        if !config.from_number.starts_with('+') {
            return Err(InfrastructureError::Config(
                "TWILIO_FROM_NUMBER must be in E.164 format (starting with '+')".to_string(),
            ));
        }

        let client = reqwest::Client::builder().timeout(request_timeout).build()?;

        info!(
            from = %mask_phone_number(&config.from_number),
            "Twilio sender initialized"
        );

        Ok(Self {
            client,
            config,
            request_timeout,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    /// Validate and normalize a phone number to E.164
    pub fn normalize_phone(phone: &str) -> Result<String, DeliveryError> {
        let phone = phone.trim().trim_start_matches(WHATSAPP_PREFIX);
        let parsed = phone.parse::<PhoneNumber>().map_err(|e| DeliveryError::InvalidTarget {
            reason: format!("Invalid phone number format: {}", e),
        })?;

        if !phonenumber::is_valid(&parsed) {
            return Err(DeliveryError::InvalidTarget {
                reason: "Phone number is not a valid number".to_string(),
            });
        }

        Ok(parsed.format().mode(Mode::E164).to_string())
    }

    /// Prefix `whatsapp:` unless already present
    pub fn whatsapp_address(address: &str) -> String {
        if address.starts_with(WHATSAPP_PREFIX) {
            address.to_string()
        } else {
            format!("{}{}", WHATSAPP_PREFIX, address)
        }
    }

    /// Resolve (from, to) for a channel
    fn addresses(&self, channel: OtpChannel, target: &str) -> Result<(String, String), DeliveryError> {
        let to = Self::normalize_phone(target)?;
        match channel {
            OtpChannel::Sms => Ok((self.config.from_number.clone(), to)),
            OtpChannel::Whatsapp => {
                if self.config.whatsapp_from.is_empty() {
                    return Err(DeliveryError::UnsupportedChannel {
                        channel: channel.to_string(),
                    });
                }
                Ok((Self::whatsapp_address(&self.config.whatsapp_from), Self::whatsapp_address(&to)))
            }
            OtpChannel::Email => Err(DeliveryError::UnsupportedChannel {
                channel: channel.to_string(),
            }),
        }
    }

    async fn attempt(&self, from: &str, to: &str, body: &str) -> Attempt {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("From", from), ("To", to), ("Body", body)])
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(format!("request failed: {}", e)),
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<MessageResponse>().await {
                Ok(message) => {
                    debug!(sid = %message.sid, status = ?message.status, "Twilio accepted message");
                    Attempt::Sent(message.sid)
                }
                Err(e) => Attempt::Fatal(format!("unreadable success response: {}", e)),
            };
        }

        let detail = match response.json::<ErrorResponse>().await {
            Ok(ErrorResponse { code, message }) => format!(
                "HTTP {} (code {}): {}",
                status.as_u16(),
                code.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
                message.unwrap_or_default()
            ),
            Err(_) => format!("HTTP {}", status.as_u16()),
        };

        if status.as_u16() == 429 || status.is_server_error() {
            Attempt::Retry(detail)
        } else {
            Attempt::Fatal(detail)
        }
    }

    /// Send with retry logic
    async fn send_with_retry(&self, from: &str, to: &str, body: &str) -> Result<String, DeliveryError> {
        let max_attempts = self.config.max_retries.max(1);
        let mut delay = Duration::from_millis(self.config.retry_delay_ms);
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(
                attempt = attempts,
                max_attempts = max_attempts,
                recipient = %mask_phone_number(to),
                "Sending Twilio message"
            );

            match self.attempt(from, to, body).await {
                Attempt::Sent(sid) => return Ok(sid),
                Attempt::Fatal(detail) => {
                    error!(recipient = %mask_phone_number(to), error = %detail, "Twilio rejected message");
                    return Err(DeliveryError::provider(PROVIDER, detail));
                }
                Attempt::Retry(detail) if attempts >= max_attempts => {
                    error!(attempts = attempts, error = %detail, "Twilio send failed, retries exhausted");
                    return Err(DeliveryError::provider(
                        PROVIDER,
                        format!("failed after {} attempts: {}", attempts, detail),
                    ));
                }
                Attempt::Retry(detail) => {
                    warn!(attempt = attempts, error = %detail, backoff_ms = delay.as_millis() as u64, "Twilio send failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
}

#[async_trait]
impl ChannelSender for TwilioSender {
    async fn send(
        &self,
        channel: OtpChannel,
        target: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<(), DeliveryError> {
        let (from, to) = self.addresses(channel, target)?;
        let sid = self.send_with_retry(&from, &to, &text_message(code, purpose)).await?;

        info!(
            channel = %channel,
            recipient = %mask_phone_number(&to),
            sid = %sid,
            event = "twilio_message_sent",
            "Twilio message sent"
        );
        Ok(())
    }

    fn provider_name(&self) -> &str {
        PROVIDER
    }

    /// Every attempt plus the backoff between them
    fn timeout(&self) -> Duration {
        let attempts = self.config.max_retries.max(1);
        let backoff: u64 = (0..attempts.saturating_sub(1))
            .map(|i| self.config.retry_delay_ms.saturating_mul(1 << i.min(16)))
            .sum();
        self.request_timeout * attempts + Duration::from_millis(backoff)
    }
}
