//! Delivery channel configuration

use serde::{Deserialize, Serialize};

use super::{env_or, env_parse, env_string};

/// Provider backing the SMS and WhatsApp channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SmsProvider {
    /// Twilio Programmable Messaging
    Twilio,
    /// Log-only sender for development
    #[default]
    Log,
}

impl std::str::FromStr for SmsProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "twilio" => Ok(SmsProvider::Twilio),
            "log" | "mock" => Ok(SmsProvider::Log),
            _ => Err(format!("Unknown SMS provider: {}", s)),
        }
    }
}

/// Twilio credentials and sending parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TwilioConfig {
    /// Twilio Account SID
    pub account_sid: String,
    /// Twilio Auth Token
    pub auth_token: String,
    /// From phone number (E.164)
    pub from_number: String,
    /// WhatsApp sender, with or without the `whatsapp:` prefix
    pub whatsapp_from: String,
    /// REST API base URL
    pub api_base_url: String,
    /// Maximum send attempts per message
    pub max_retries: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            whatsapp_from: String::new(),
            api_base_url: String::from("https://api.twilio.com"),
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// Transactional email HTTP API settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EmailConfig {
    /// Endpoint accepting `{from, to, subject, html}` JSON; empty disables real email
    pub api_url: String,
    /// Bearer key for the endpoint
    pub api_key: String,
    /// Sender address
    pub from_address: String,
    /// Sender display name
    pub from_name: String,
}

impl EmailConfig {
    /// Whether a real email provider is configured
    pub fn is_configured(&self) -> bool {
        !self.api_url.is_empty()
    }
}

/// Configuration for every outbound channel
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelsConfig {
    /// Provider for SMS and WhatsApp
    pub sms_provider: SmsProvider,
    /// Twilio settings (used when `sms_provider` is Twilio)
    pub twilio: TwilioConfig,
    /// Email settings
    pub email: EmailConfig,
    /// Upper bound for a single channel send, in seconds
    pub request_timeout_secs: u64,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            sms_provider: SmsProvider::default(),
            twilio: TwilioConfig::default(),
            email: EmailConfig::default(),
            request_timeout_secs: 30,
        }
    }
}

impl ChannelsConfig {
    /// Create from environment variables
    ///
    /// An unrecognised `SMS_PROVIDER` is an error rather than a silent fallback.
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();
        let twilio_defaults = TwilioConfig::default();

        Ok(Self {
            sms_provider: env_parse("SMS_PROVIDER", defaults.sms_provider)?,
            twilio: TwilioConfig {
                account_sid: env_string("TWILIO_ACCOUNT_SID", ""),
                auth_token: env_string("TWILIO_AUTH_TOKEN", ""),
                from_number: env_string("TWILIO_FROM_NUMBER", ""),
                whatsapp_from: env_string("TWILIO_WHATSAPP_FROM", ""),
                api_base_url: env_string("TWILIO_API_BASE_URL", &twilio_defaults.api_base_url),
                max_retries: env_or("TWILIO_MAX_RETRIES", twilio_defaults.max_retries),
                retry_delay_ms: env_or("TWILIO_RETRY_DELAY_MS", twilio_defaults.retry_delay_ms),
            },
            email: EmailConfig {
                api_url: env_string("EMAIL_API_URL", ""),
                api_key: env_string("EMAIL_API_KEY", ""),
                from_address: env_string("EMAIL_FROM_ADDRESS", "no-reply@keygate.local"),
                from_name: env_string("EMAIL_FROM_NAME", "Keygate"),
            },
            request_timeout_secs: env_or("CHANNEL_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
        })
    }
}
