//! Service error types with HTTP status code mapping.
//!
//! [`ServiceError`] is the central error type for the service. Every
//! component boundary maps its failures onto one of these variants, and each
//! variant maps to a specific HTTP status code and structured JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Message returned for every failed code check. Wrong, expired and absent
/// codes are deliberately indistinguishable.
pub const INVALID_OR_EXPIRED_MESSAGE: &str = "verification code is invalid or has expired";

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// `details` is omitted when empty.
///
/// ```json
/// {
///   "error": {
///     "code": 2003,
///     "kind": "already_registered",
///     "message": "email already in use"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Stable machine-readable kind (e.g. `already_registered`).
    pub kind: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category                    | HTTP Status            |
/// |-----------|-----------------------------|------------------------|
/// | 1000–1999 | Validation                  | 400 Bad Request        |
/// | 2000–2999 | Not found / conflict / gate | 401 / 403 / 404 / 409  |
/// | 3000–3999 | Server / dependency         | 500 / 502              |
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Missing or malformed input, rejected before touching storage.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Submitted verification code is wrong, expired, superseded or absent.
    #[error("{}", INVALID_OR_EXPIRED_MESSAGE)]
    InvalidOrExpired,

    /// Email domain is outside the allowed set.
    #[error("email domain not allowed: {0}")]
    DomainRejected(String),

    /// An account with this email already exists.
    #[error("email already in use")]
    AlreadyRegistered,

    /// The account has already completed verification.
    #[error("account is already verified")]
    AlreadyVerified,

    /// No account exists for the given email.
    #[error("account not found")]
    AccountNotFound,

    /// Unknown account or mismatched credential.
    #[error("invalid email or credential")]
    InvalidCredentials,

    /// The account exists but has not completed email verification.
    #[error("account {email} must be verified before logging in")]
    VerificationRequired {
        /// Email the client should pass to the resend endpoint.
        email: String,
    },

    /// Item with the given ID was not found.
    #[error("item not found: {0}")]
    ItemNotFound(uuid::Uuid),

    /// Borrowing request with the given ID was not found.
    #[error("borrowing request not found: {0}")]
    RequestNotFound(uuid::Uuid),

    /// The borrowing request already has a history record.
    #[error("borrowing request {0} has already been returned")]
    AlreadyReturned(uuid::Uuid),

    /// The code was stored but the notification sender failed.
    #[error("verification email could not be sent: {0}")]
    NotificationFailed(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidOrExpired => 1002,
            Self::AccountNotFound => 2001,
            Self::DomainRejected(_) => 2002,
            Self::AlreadyRegistered => 2003,
            Self::AlreadyVerified => 2004,
            Self::InvalidCredentials => 2005,
            Self::VerificationRequired { .. } => 2006,
            Self::ItemNotFound(_) => 2007,
            Self::RequestNotFound(_) => 2008,
            Self::AlreadyReturned(_) => 2009,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::NotificationFailed(_) => 3002,
        }
    }

    /// Returns the machine-readable kind string for this variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidOrExpired => "invalid_or_expired",
            Self::AccountNotFound | Self::ItemNotFound(_) | Self::RequestNotFound(_) => {
                "not_found"
            }
            Self::DomainRejected(_) => "domain_rejected",
            Self::AlreadyRegistered => "already_registered",
            Self::AlreadyVerified => "already_verified",
            Self::InvalidCredentials => "invalid_credentials",
            Self::VerificationRequired { .. } => "verification_required",
            Self::AlreadyReturned(_) => "already_returned",
            Self::NotificationFailed(_) => "notification_failed",
            Self::Persistence(_) | Self::Internal(_) => "internal",
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidOrExpired => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::DomainRejected(_) | Self::VerificationRequired { .. } => StatusCode::FORBIDDEN,
            Self::AccountNotFound | Self::ItemNotFound(_) | Self::RequestNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::AlreadyRegistered | Self::AlreadyVerified | Self::AlreadyReturned(_) => {
                StatusCode::CONFLICT
            }
            Self::NotificationFailed(_) => StatusCode::BAD_GATEWAY,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message exposed to clients. Server-side failures are collapsed to a
    /// generic message; the detailed cause only goes to the log.
    fn public_message(&self) -> String {
        match self {
            Self::Persistence(_) | Self::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Client-facing body for this error.
    fn to_response_body(&self) -> ErrorResponse {
        let details = match self {
            Self::VerificationRequired { email } => Some(email.clone()),
            _ => None,
        };
        ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                kind: self.kind().to_string(),
                message: self.public_message(),
                details,
            },
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        }
        let mut response = axum::Json(self.to_response_body()).into_response();
        *response.status_mut() = status;
        response
    }
}
