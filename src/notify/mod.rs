//! Unified notification dispatch: Slack, email (SMTP), and Twilio SMS.
//!
//! One `send()` entry point branches on the channel. Each channel reads its
//! own credentials from config; a channel with missing credentials fails the
//! request instead of silently dropping the notification.

use std::fmt;
use std::sync::Arc;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::config::AppConfig;

const DEFAULT_EMAIL_SUBJECT: &str = "TEJUSKA Cloud Intelligence Alert";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("{0} is not configured")]
    MissingConfig(&'static str),
    #[error("Slack webhook returned HTTP {0}")]
    SlackStatus(reqwest::StatusCode),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build email: {0}")]
    Email(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("Twilio returned an unexpected response shape")]
    MalformedTwilioResponse,
}

/// Notification channel. Deserialized from the lowercase wire form, so an
/// unknown channel is rejected at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Slack,
    Email,
    Sms,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slack => write!(f, "slack"),
            Self::Email => write!(f, "email"),
            Self::Sms => write!(f, "sms"),
        }
    }
}

// ─── Notifier ─────────────────────────────────────────────────────────────────

pub struct Notifier {
    config: Arc<AppConfig>,
    http: reqwest::Client,
}

impl Notifier {
    pub fn new(config: Arc<AppConfig>, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// Dispatch a notification and return a human-readable confirmation.
    ///
    /// `recipient` is an email address for `email`, an E.164 phone number
    /// for `sms`, and unused for `slack` (the webhook URL comes from config).
    /// `subject` only applies to email.
    pub async fn send(
        &self,
        channel: Channel,
        recipient: &str,
        subject: Option<&str>,
        body: &str,
    ) -> Result<String, NotifyError> {
        match channel {
            Channel::Slack => self.send_slack(body).await,
            Channel::Email => {
                self.send_email(recipient, subject.unwrap_or(DEFAULT_EMAIL_SUBJECT), body)
                    .await
            }
            Channel::Sms => self.send_sms(recipient, body).await,
        }
    }

    // ─── Slack ───────────────────────────────────────────────────────────────

    async fn send_slack(&self, body: &str) -> Result<String, NotifyError> {
        let url = self
            .config
            .slack_webhook_url
            .as_deref()
            .ok_or(NotifyError::MissingConfig("SLACK_WEBHOOK_URL"))?;

        let response = self.http.post(url).json(&json!({ "text": body })).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::SlackStatus(response.status()));
        }
        info!("Slack notification delivered");
        Ok("Slack notification delivered.".to_string())
    }

    // ─── Email via SMTP ──────────────────────────────────────────────────────

    async fn send_email(
        &self,
        to_address: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, NotifyError> {
        let smtp = &self.config.smtp;
        let user = smtp
            .user
            .as_deref()
            .ok_or(NotifyError::MissingConfig("SMTP_USER"))?;
        let password = smtp
            .password
            .as_deref()
            .ok_or(NotifyError::MissingConfig("SMTP_PASSWORD"))?;

        let message = Message::builder()
            .from(user.parse()?)
            .to(to_address.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
            .port(smtp.port)
            .credentials(Credentials::new(user.to_string(), password.to_string()))
            .build();

        transport.send(message).await?;
        info!(to = to_address, "email notification delivered");
        Ok(format!("Email delivered to {to_address}."))
    }

    // ─── SMS via Twilio ──────────────────────────────────────────────────────

    async fn send_sms(&self, to_number: &str, body: &str) -> Result<String, NotifyError> {
        let twilio = &self.config.twilio;
        let sid = twilio
            .account_sid
            .as_deref()
            .ok_or(NotifyError::MissingConfig("TWILIO_ACCOUNT_SID"))?;
        let token = twilio
            .auth_token
            .as_deref()
            .ok_or(NotifyError::MissingConfig("TWILIO_AUTH_TOKEN"))?;
        let from = twilio
            .from_number
            .as_deref()
            .ok_or(NotifyError::MissingConfig("TWILIO_FROM_NUMBER"))?;

        let url = format!(
            "{}/2010-04-01/Accounts/{sid}/Messages.json",
            self.config.twilio_base_url
        );
        let response: Value = self
            .http
            .post(&url)
            .basic_auth(sid, Some(token))
            .form(&[("To", to_number), ("From", from), ("Body", body)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let message_sid = response["sid"]
            .as_str()
            .ok_or(NotifyError::MalformedTwilioResponse)?;
        info!(to = to_number, sid = message_sid, "SMS delivered");
        Ok(format!("SMS delivered to {to_number}. SID: {message_sid}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_parses_lowercase_wire_form() {
        assert_eq!(serde_json::from_str::<Channel>("\"slack\"").unwrap(), Channel::Slack);
        assert_eq!(serde_json::from_str::<Channel>("\"email\"").unwrap(), Channel::Email);
        assert_eq!(serde_json::from_str::<Channel>("\"sms\"").unwrap(), Channel::Sms);
        assert!(serde_json::from_str::<Channel>("\"pager\"").is_err());
    }

    #[tokio::test]
    async fn unconfigured_slack_channel_fails() {
        let mut config = AppConfig::new(None, Some(std::env::temp_dir()), None, None);
        config.slack_webhook_url = None;
        let notifier = Notifier::new(Arc::new(config), reqwest::Client::new());

        let err = notifier
            .send(Channel::Slack, "", None, "cost spike detected")
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::MissingConfig("SLACK_WEBHOOK_URL")));
    }

    #[tokio::test]
    async fn unconfigured_twilio_channel_fails() {
        let mut config = AppConfig::new(None, Some(std::env::temp_dir()), None, None);
        config.twilio.account_sid = None;
        let notifier = Notifier::new(Arc::new(config), reqwest::Client::new());

        let err = notifier
            .send(Channel::Sms, "+15550100", None, "cost spike detected")
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::MissingConfig("TWILIO_ACCOUNT_SID")));
    }
}
