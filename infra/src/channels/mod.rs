//! Delivery channel adapters
//!
//! Each adapter implements `ChannelSender` for one provider. [`create_dispatcher`]
//! registers them per channel from configuration.

mod email;
mod log;
mod twilio;

use std::sync::Arc;
use std::time::Duration;

use kg_core::domain::entities::OtpChannel;
use kg_core::services::delivery::Dispatcher;
use kg_shared::config::{ChannelsConfig, Environment, SmsProvider};
use tracing::{info, warn};

use crate::InfrastructureError;

pub use email::EmailSender;
pub use log::LogSender;
pub use twilio::TwilioSender;

/// Build the channel registry from configuration
///
/// SMS and WhatsApp share one Twilio sender; WhatsApp is only registered when a
/// WhatsApp sender number is configured. Without an email API, email falls back
/// to the log sender in development and stays unregistered elsewhere, so those
/// tasks fail instead of being reported as sent.
pub fn create_dispatcher(
    config: &ChannelsConfig,
    environment: Environment,
) -> Result<Dispatcher, InfrastructureError> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let mut dispatcher = Dispatcher::new();

    match config.sms_provider {
        SmsProvider::Twilio => {
            let twilio = Arc::new(TwilioSender::new(config.twilio.clone(), timeout)?);
            dispatcher = dispatcher.register(OtpChannel::Sms, twilio.clone());
            if config.twilio.whatsapp_from.is_empty() {
                warn!("TWILIO_WHATSAPP_FROM not set, WhatsApp channel disabled");
            } else {
                dispatcher = dispatcher.register(OtpChannel::Whatsapp, twilio);
            }
        }
        SmsProvider::Log => {
            let log = Arc::new(LogSender::new());
            dispatcher = dispatcher
                .register(OtpChannel::Sms, log.clone())
                .register(OtpChannel::Whatsapp, log);
        }
    }

    if config.email.is_configured() {
        dispatcher = dispatcher.register(OtpChannel::Email, Arc::new(EmailSender::new(config.email.clone(), timeout)?));
    } else if environment == Environment::Development {
        warn!("EMAIL_API_URL not set, email codes are only logged");
        dispatcher = dispatcher.register(OtpChannel::Email, Arc::new(LogSender::new()));
    } else {
        warn!(environment = %environment, "EMAIL_API_URL not set, email channel disabled");
    }

    info!(channels = ?dispatcher.channels(), "Delivery channels registered");
    Ok(dispatcher)
}
