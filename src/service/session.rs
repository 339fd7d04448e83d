//! Login gate: an account may sign in only once it is verified.

use std::sync::Arc;

use crate::domain::{Account, EmailAddress};
use crate::error::ServiceError;
use crate::persistence::AccountStore;

/// Decides whether a login attempt may proceed.
///
/// Unknown emails and wrong credentials produce the same
/// [`ServiceError::InvalidCredentials`]. The credential is checked before
/// the verification flag, so an unverified account's state is only revealed
/// to a caller who holds its credential (or to anyone, for accounts that
/// have none).
#[derive(Debug, Clone)]
pub struct SessionGate {
    accounts: Arc<dyn AccountStore>,
}

impl SessionGate {
    /// Creates a new `SessionGate`.
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    /// Authenticates a member.
    ///
    /// Accounts registered without a credential sign in by email alone;
    /// accounts with one require `credential` to match.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidCredentials`] if the account is absent
    /// or the credential does not match,
    /// [`ServiceError::VerificationRequired`] if the account has not been
    /// verified yet, or [`ServiceError::Persistence`] on storage failure.
    pub async fn authenticate(
        &self,
        email: &str,
        credential: Option<&str>,
    ) -> Result<Account, ServiceError> {
        let email = EmailAddress::parse(email).map_err(|_| ServiceError::InvalidCredentials)?;
        let Some(account) = self.accounts.find_account_by_email(&email).await? else {
            tracing::debug!(%email, "login for unknown account");
            return Err(ServiceError::InvalidCredentials);
        };

        if let Some(stored) = &account.credential_hash {
            let presented = credential.unwrap_or_default();
            if !stored.verify(presented) {
                tracing::debug!(account_id = %account.id, "login with wrong credential");
                return Err(ServiceError::InvalidCredentials);
            }
        }

        if !account.is_verified {
            return Err(ServiceError::VerificationRequired {
                email: account.email.to_string(),
            });
        }

        tracing::info!(account_id = %account.id, "login accepted");
        Ok(account)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::Activation;
    use crate::test_support::Harness;

    const EMAIL: &str = "a@allowed.example";

    fn gate(h: &Harness) -> SessionGate {
        SessionGate::new(Arc::clone(&h.store) as _)
    }

    #[tokio::test]
    async fn unknown_account_is_invalid_credentials() {
        let h = Harness::new();
        let result = gate(&h).authenticate("ghost@allowed.example", None).await;
        assert!(matches!(result, Err(ServiceError::InvalidCredentials)));

        let malformed = gate(&h).authenticate("not-an-email", None).await;
        assert!(matches!(malformed, Err(ServiceError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn unverified_account_must_verify_first() {
        let h = Harness::new();
        let _ = h.verification.signup(EMAIL, "A", None).await;

        let result = gate(&h).authenticate(EMAIL, None).await;
        let Err(ServiceError::VerificationRequired { email }) = result else {
            panic!("expected verification gate");
        };
        assert_eq!(email, EMAIL);
    }

    #[tokio::test]
    async fn credential_is_checked_before_verification() {
        let h = Harness::new();
        let Ok(receipt) = h
            .verification
            .signup(EMAIL, "A", Some("hunter2hunter2"))
            .await
        else {
            panic!("signup failed");
        };

        let wrong = gate(&h).authenticate(EMAIL, Some("letmein!!")).await;
        assert!(matches!(wrong, Err(ServiceError::InvalidCredentials)));
        let missing = gate(&h).authenticate(EMAIL, None).await;
        assert!(matches!(missing, Err(ServiceError::InvalidCredentials)));

        let unverified = gate(&h).authenticate(EMAIL, Some("hunter2hunter2")).await;
        assert!(matches!(unverified, Err(ServiceError::VerificationRequired { .. })));

        let activated = h.verification.activate(EMAIL, receipt.code.as_str()).await;
        assert!(matches!(activated, Ok(Activation::Verified(_))));

        let Ok(account) = gate(&h).authenticate(EMAIL, Some("hunter2hunter2")).await else {
            panic!("login failed");
        };
        assert_eq!(account.email.as_str(), EMAIL);
    }

    #[tokio::test]
    async fn signup_resend_verify_login_scenario() {
        let h = Harness::new();
        let Ok(c1) = h.verification.signup(EMAIL, "A", None).await else {
            panic!("signup failed");
        };
        let Ok(c2) = h.verification.resend(EMAIL).await else {
            panic!("resend failed");
        };
        assert_eq!(h.notifier.last_code(), c2.code.as_str());

        if c1.code != c2.code {
            let stale = h.verification.activate(EMAIL, c1.code.as_str()).await;
            assert!(matches!(stale, Err(ServiceError::InvalidOrExpired)));
        }

        let verified = h.verification.activate(EMAIL, c2.code.as_str()).await;
        assert!(matches!(verified, Ok(Activation::Verified(_))));

        let Ok(account) = gate(&h).authenticate(EMAIL, None).await else {
            panic!("login failed");
        };
        assert!(account.is_verified);
        assert_eq!(account.display_name, "A");
    }
}
