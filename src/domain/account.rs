//! Member accounts and their verification state.

use chrono::{DateTime, Utc};

use super::credential::CredentialHash;
use super::email::EmailAddress;
use super::ids::AccountId;
use super::verification_code::IssuedCode;

/// Longest accepted display name, in characters.
pub const MAX_DISPLAY_NAME_LEN: usize = 100;

/// A member account as persisted in the `accounts` table.
///
/// # Invariant
///
/// `is_verified` implies that both `verification_code` and
/// `code_expires_at` are `None`. Only the issue and activate store paths
/// write these three fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Account identifier.
    pub id: AccountId,
    /// Normalized email, unique across accounts.
    pub email: EmailAddress,
    /// Name shown to other members.
    pub display_name: String,
    /// Currently active code, if any.
    pub verification_code: Option<String>,
    /// Expiry of the active code.
    pub code_expires_at: Option<DateTime<Utc>>,
    /// Whether the member proved control of the email address.
    pub is_verified: bool,
    /// Optional one-way credential. `None` means email-only login.
    pub credential_hash: Option<CredentialHash>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Builds the unverified account written at signup.
    #[must_use]
    pub fn pending(signup: NewAccount, issued: &IssuedCode, now: DateTime<Utc>) -> Self {
        Self {
            id: AccountId::new(),
            email: signup.email,
            display_name: signup.display_name,
            verification_code: Some(issued.code.as_str().to_string()),
            code_expires_at: Some(issued.expires_at),
            is_verified: false,
            credential_hash: signup.credential_hash,
            created_at: now,
        }
    }

    /// Returns `true` if the state-machine invariant holds for this row.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        !self.is_verified || (self.verification_code.is_none() && self.code_expires_at.is_none())
    }
}

/// Validated signup input.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Normalized email.
    pub email: EmailAddress,
    /// Trimmed display name.
    pub display_name: String,
    /// Optional credential digest.
    pub credential_hash: Option<CredentialHash>,
}

/// Result of storing a freshly issued code on an existing account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeReplacement {
    /// The new code superseded whatever was stored before.
    Replaced(Account),
    /// The account is verified; nothing was written.
    AlreadyVerified,
    /// No account has this email.
    NotFound,
}

/// Result of a successful activation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// The submitted code was consumed and the account is now verified.
    Verified(Account),
    /// The account was verified before this call; nothing changed.
    AlreadyVerified(Account),
}

impl Activation {
    /// Returns the account in either outcome.
    #[must_use]
    pub const fn account(&self) -> &Account {
        match self {
            Self::Verified(account) | Self::AlreadyVerified(account) => account,
        }
    }
}
