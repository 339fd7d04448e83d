//! Sender that posts messages to a transactional-mail HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{NotificationSender, NotifyError, render_body};
use crate::domain::{EmailAddress, VerificationCode};

const SUBJECT: &str = "Your verification code";

/// Settings for [`HttpNotifier`].
#[derive(Debug, Clone)]
pub struct HttpNotifierConfig {
    /// Endpoint accepting a JSON message (e.g. `https://api.mailer.example/emails`).
    pub url: String,
    /// Bearer token sent in the `Authorization` header, if set.
    pub api_key: Option<String>,
    /// `From` header value.
    pub from: String,
    /// Code validity window quoted in the message body.
    pub ttl_minutes: i64,
    /// Per-request timeout.
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct OutboundEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: String,
}

/// Posts each verification email as JSON to a mail API.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    config: HttpNotifierConfig,
    client: Client,
}

impl HttpNotifier {
    /// Builds the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns a [`reqwest::Error`] if the TLS backend cannot be initialized.
    pub fn new(config: HttpNotifierConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl NotificationSender for HttpNotifier {
    async fn send(
        &self,
        recipient: &EmailAddress,
        code: &VerificationCode,
        display_name: &str,
    ) -> Result<(), NotifyError> {
        let payload = OutboundEmail {
            from: &self.config.from,
            to: [recipient.as_str()],
            subject: SUBJECT,
            text: render_body(code, display_name, self.config.ttl_minutes),
        };

        let mut request = self.client.post(&self.config.url).json(&payload);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%recipient, status = status.as_u16(), "mailer rejected message");
            return Err(NotifyError::Rejected(status.as_u16()));
        }

        tracing::debug!(%recipient, "verification email accepted by mailer");
        Ok(())
    }
}
