//! Outbound verification-code notifications.
//!
//! The services only see the [`NotificationSender`] trait. Delivery
//! failures are reported as [`NotifyError`] and never undo the write that
//! preceded the send.

pub mod http;
pub mod log;

use std::fmt;

use async_trait::async_trait;

use crate::domain::{EmailAddress, VerificationCode};

pub use http::HttpNotifier;
pub use log::LogNotifier;

/// Failure to hand a message to the delivery channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// The delivery endpoint could not be reached.
    #[error("mailer unreachable: {0}")]
    Unreachable(String),
    /// The delivery endpoint refused the message.
    #[error("mailer rejected message with status {0}")]
    Rejected(u16),
}

/// Sends a verification code to a member.
#[async_trait]
pub trait NotificationSender: Send + Sync + fmt::Debug {
    /// Delivers `code` to `recipient`, addressed by `display_name`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the message could not be handed off.
    async fn send(
        &self,
        recipient: &EmailAddress,
        code: &VerificationCode,
        display_name: &str,
    ) -> Result<(), NotifyError>;
}

/// Renders the plain-text body of a verification email.
#[must_use]
pub fn render_body(code: &VerificationCode, display_name: &str, ttl_minutes: i64) -> String {
    format!(
        "Hi {display_name},\n\n\
         Your verification code is {code}. It expires in {ttl_minutes} minutes.\n\n\
         If you did not sign up, you can ignore this email.\n"
    )
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn body_mentions_code_name_and_window() {
        let Ok(code) = VerificationCode::parse("314159") else {
            panic!("valid code rejected");
        };
        let body = render_body(&code, "Ada", 15);
        assert!(body.contains("Hi Ada"));
        assert!(body.contains("314159"));
        assert!(body.contains("15 minutes"));
    }
}
