//! Email sender over a transactional-mail HTTP API

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

use kg_core::domain::entities::{OtpChannel, OtpPurpose};
use kg_core::errors::DeliveryError;
use kg_core::services::delivery::{email_body, email_subject, ChannelSender};
use kg_shared::config::EmailConfig;
use kg_shared::utils::{is_email, mask_email};

use crate::InfrastructureError;

const PROVIDER: &str = "email";

/// Longest provider error body kept in an error message
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Serialize)]
struct EmailRequest<'a> {
    from: String,
    to: [&'a str; 1],
    subject: &'a str,
    html: String,
}

/// Posts `{from, to, subject, html}` JSON with a bearer key
pub struct EmailSender {
    client: reqwest::Client,
    config: EmailConfig,
    request_timeout: Duration,
}

impl EmailSender {
    pub fn new(config: EmailConfig, request_timeout: Duration) -> Result<Self, InfrastructureError> {
        if !config.is_configured() {
            return Err(InfrastructureError::Config("EMAIL_API_URL must be set".to_string()));
        }
        if !is_email(&config.from_address) {
            return Err(InfrastructureError::Config(format!(
                "EMAIL_FROM_ADDRESS is not an email address: {}",
                config.from_address
            )));
        }

        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            config,
            request_timeout,
        })
    }

    fn from_header(&self) -> String {
        if self.config.from_name.is_empty() {
            self.config.from_address.clone()
        } else {
            format!("{} <{}>", self.config.from_name, self.config.from_address)
        }
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    async fn send(
        &self,
        channel: OtpChannel,
        target: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<(), DeliveryError> {
        if channel != OtpChannel::Email {
            return Err(DeliveryError::UnsupportedChannel {
                channel: channel.to_string(),
            });
        }
        if !is_email(target) {
            return Err(DeliveryError::InvalidTarget {
                reason: "Not an email address".to_string(),
            });
        }

        let request = EmailRequest {
            from: self.from_header(),
            to: [target],
            subject: email_subject(purpose),
            html: email_body(code, purpose),
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DeliveryError::provider(PROVIDER, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            error!(
                recipient = %mask_email(target),
                status = status.as_u16(),
                purpose = %purpose,
                "Email provider rejected message"
            );
            return Err(DeliveryError::provider(
                PROVIDER,
                format!("HTTP {}: {}", status.as_u16(), body),
            ));
        }

        info!(
            recipient = %mask_email(target),
            purpose = %purpose,
            event = "email_sent",
            "Verification email sent"
        );
        Ok(())
    }

    fn provider_name(&self) -> &str {
        PROVIDER
    }

    fn timeout(&self) -> Duration {
        self.request_timeout
    }
}
