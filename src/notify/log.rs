//! Development sender that writes codes to the log.

use async_trait::async_trait;

use super::{NotificationSender, NotifyError};
use crate::domain::{EmailAddress, VerificationCode};

/// Logs each code at `info` level instead of sending mail.
///
/// Used when no mailer endpoint is configured, so a local operator can read
/// codes from the console.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSender for LogNotifier {
    async fn send(
        &self,
        recipient: &EmailAddress,
        code: &VerificationCode,
        display_name: &str,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            %recipient,
            display_name,
            code = code.as_str(),
            "verification code (log delivery)"
        );
        Ok(())
    }
}
