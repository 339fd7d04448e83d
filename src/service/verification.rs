//! Account verification: code issuance at signup and resend, and activation.
//!
//! Every write to the code, expiry and verified columns goes through this
//! service, and each write is a single conditional store operation:
//!
//! - signup inserts the account together with its first code;
//! - resend replaces the code only while the account is unverified, so the
//!   previous code is dead the moment the new one is stored;
//! - activation consumes the code with one update keyed on email, code and
//!   expiry, so a code superseded by a concurrent resend can never win.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::SharedClock;
use crate::domain::account::MAX_DISPLAY_NAME_LEN;
use crate::domain::{
    Account, Activation, AllowedDomains, CodeReplacement, CredentialHash, EmailAddress,
    IssuedCode, NewAccount, VerificationCode,
};
use crate::error::ServiceError;
use crate::notify::{NotificationSender, NotifyError};
use crate::persistence::AccountStore;

/// Whether the verification email reached the delivery channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The sender accepted the message.
    Sent,
    /// The sender failed; the code is stored and can be resent.
    Failed(NotifyError),
}

/// Outcome of a successful code issuance.
#[derive(Debug, Clone)]
pub struct IssueReceipt {
    /// The account after the code was stored.
    pub account: Account,
    /// The code that was stored and sent.
    pub code: VerificationCode,
    /// First instant at which the code is rejected.
    pub expires_at: DateTime<Utc>,
    /// Notification result.
    pub delivery: Delivery,
}

impl IssueReceipt {
    /// Returns the error a caller should surface if delivery failed.
    #[must_use]
    pub fn notification_error(&self) -> Option<ServiceError> {
        match &self.delivery {
            Delivery::Sent => None,
            Delivery::Failed(err) => Some(ServiceError::NotificationFailed(err.to_string())),
        }
    }
}

/// Issues, resends and consumes verification codes.
pub struct VerificationService {
    accounts: Arc<dyn AccountStore>,
    notifier: Arc<dyn NotificationSender>,
    clock: SharedClock,
    allowed_domains: AllowedDomains,
    code_ttl: Duration,
}

impl fmt::Debug for VerificationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationService")
            .field("accounts", &self.accounts)
            .field("notifier", &self.notifier)
            .field("allowed_domains", &self.allowed_domains)
            .field("code_ttl", &self.code_ttl)
            .finish_non_exhaustive()
    }
}

impl VerificationService {
    /// Creates a new `VerificationService`.
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        notifier: Arc<dyn NotificationSender>,
        clock: SharedClock,
        allowed_domains: AllowedDomains,
        code_ttl: Duration,
    ) -> Self {
        Self {
            accounts,
            notifier,
            clock,
            allowed_domains,
            code_ttl,
        }
    }

    /// Registers an unverified account and sends its first code.
    ///
    /// A failed send does not undo the account; the receipt reports
    /// [`Delivery::Failed`] and the member can ask for a resend.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] for malformed input,
    /// [`ServiceError::DomainRejected`] if the email's domain is not allowed,
    /// [`ServiceError::AlreadyRegistered`] if the email is taken,
    /// [`ServiceError::Internal`] if the configured window overflows the
    /// clock, or [`ServiceError::Persistence`] on storage failure.
    pub async fn signup(
        &self,
        email: &str,
        display_name: &str,
        credential: Option<&str>,
    ) -> Result<IssueReceipt, ServiceError> {
        let email = EmailAddress::parse(email)?;
        let display_name = validate_display_name(display_name)?;
        let credential_hash = credential.map(CredentialHash::derive).transpose()?;
        self.allowed_domains.check(&email)?;

        let now = self.clock.utc();
        let issued = IssuedCode::issue(now, self.code_ttl)?;
        let account = Account::pending(
            NewAccount {
                email,
                display_name,
                credential_hash,
            },
            &issued,
            now,
        );
        self.accounts.insert_pending_account(&account).await?;
        tracing::info!(account_id = %account.id, email = %account.email, "account created, awaiting verification");

        Ok(self.deliver(account, issued).await)
    }

    /// Issues a fresh code for an unverified account, superseding the old one.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] for a malformed email,
    /// [`ServiceError::AccountNotFound`] if no account has this email,
    /// [`ServiceError::AlreadyVerified`] if the account is verified,
    /// [`ServiceError::Internal`] if the configured window overflows the
    /// clock, or [`ServiceError::Persistence`] on storage failure.
    pub async fn resend(&self, email: &str) -> Result<IssueReceipt, ServiceError> {
        let email = EmailAddress::parse(email)?;
        let issued = IssuedCode::issue(self.clock.utc(), self.code_ttl)?;

        let account = match self.accounts.replace_code(&email, &issued).await? {
            CodeReplacement::Replaced(account) => account,
            CodeReplacement::AlreadyVerified => return Err(ServiceError::AlreadyVerified),
            CodeReplacement::NotFound => return Err(ServiceError::AccountNotFound),
        };
        tracing::info!(account_id = %account.id, "verification code reissued");

        Ok(self.deliver(account, issued).await)
    }

    /// Consumes a submitted code and marks the account verified.
    ///
    /// Calling this for an account that is already verified returns
    /// [`Activation::AlreadyVerified`] regardless of the code submitted.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] for a malformed email,
    /// [`ServiceError::InvalidOrExpired`] if there is no matching, unexpired
    /// code for this email (including unknown emails), or
    /// [`ServiceError::Persistence`] on storage failure.
    pub async fn activate(&self, email: &str, code: &str) -> Result<Activation, ServiceError> {
        let email = EmailAddress::parse(email)?;
        let now = self.clock.utc();

        if let Ok(code) = VerificationCode::parse(code)
            && let Some(account) = self.accounts.consume_code(&email, &code, now).await?
        {
            tracing::info!(account_id = %account.id, "account verified");
            return Ok(Activation::Verified(account));
        }

        match self.accounts.find_account_by_email(&email).await? {
            Some(account) if account.is_verified => Ok(Activation::AlreadyVerified(account)),
            _ => {
                tracing::debug!(%email, "verification attempt rejected");
                Err(ServiceError::InvalidOrExpired)
            }
        }
    }

    async fn deliver(&self, account: Account, issued: IssuedCode) -> IssueReceipt {
        let delivery = match self
            .notifier
            .send(&account.email, &issued.code, &account.display_name)
            .await
        {
            Ok(()) => Delivery::Sent,
            Err(err) => {
                tracing::warn!(account_id = %account.id, error = %err, "verification email not sent");
                Delivery::Failed(err)
            }
        };
        IssueReceipt {
            account,
            code: issued.code,
            expires_at: issued.expires_at,
            delivery,
        }
    }
}

fn validate_display_name(raw: &str) -> Result<String, ServiceError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidRequest("display name is required".to_string()));
    }
    if name.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(ServiceError::InvalidRequest(format!(
            "display name exceeds {MAX_DISPLAY_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}
