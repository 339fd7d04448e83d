//! Account DTOs for signup, resend, verify and login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Account;

/// Request body for `POST /accounts/signup`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    /// Email address; its domain must be on the allow-list.
    pub email: String,
    /// Name shown to other members (max 100 chars).
    pub display_name: String,
    /// Optional login secret (min 8 chars). Omit for email-only login.
    #[serde(default)]
    pub credential: Option<String>,
}

/// Response body for `POST /accounts/signup` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
pub struct SignupResponse {
    /// Always `pending_verification`.
    pub status: String,
    /// New account identifier.
    pub account_id: Uuid,
    /// Normalized email.
    pub email: String,
    /// First instant at which the code is rejected.
    pub code_expires_at: DateTime<Utc>,
    /// `sent`, or `failed` when the email could not be delivered.
    pub notification: String,
}

/// Request body for `POST /accounts/resend`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResendRequest {
    /// Email of the unverified account.
    pub email: String,
}

/// Response body for `POST /accounts/resend`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResendResponse {
    /// Always `sent`.
    pub status: String,
    /// Expiry of the new code.
    pub code_expires_at: DateTime<Utc>,
}

/// Request body for `POST /accounts/verify`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyRequest {
    /// Email the code was sent to.
    pub email: String,
    /// Six-digit code.
    pub code: String,
}

/// Response body for `POST /accounts/verify`.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyResponse {
    /// `verified`, or `already_verified` on a repeat call.
    pub status: String,
    /// The verified account.
    pub account: AccountDto,
}

/// Request body for `POST /accounts/login`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Login secret, for accounts registered with one.
    #[serde(default)]
    pub credential: Option<String>,
}

/// Response body for `POST /accounts/login`.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// The signed-in account.
    pub account: AccountDto,
}

/// Public view of an account. Never carries the code or credential.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccountDto {
    /// Account identifier.
    pub account_id: Uuid,
    /// Normalized email.
    pub email: String,
    /// Display name.
    pub display_name: String,
    /// Verification flag.
    pub is_verified: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountDto {
    fn from(account: &Account) -> Self {
        Self {
            account_id: *account.id.as_uuid(),
            email: account.email.to_string(),
            display_name: account.display_name.clone(),
            is_verified: account.is_verified,
            created_at: account.created_at,
        }
    }
}
