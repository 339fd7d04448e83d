//! Account handlers: signup, resend, verify, login.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{
    AccountDto, LoginRequest, LoginResponse, ResendRequest, ResendResponse, SignupRequest,
    SignupResponse, VerifyRequest, VerifyResponse,
};
use crate::app_state::AppState;
use crate::domain::Activation;
use crate::error::{ErrorResponse, ServiceError};
use crate::service::Delivery;

/// `POST /accounts/signup` — Register and send the first code.
///
/// # Errors
///
/// Returns [`ServiceError`] on invalid input, a disallowed domain, or a
/// taken email.
#[utoipa::path(
    post,
    path = "/api/v1/accounts/signup",
    tag = "Accounts",
    summary = "Sign up",
    description = "Creates an unverified account and emails a six-digit code. If the email cannot be sent the account is still created and `notification` is `failed`; use resend.",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created, awaiting verification", body = SignupResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Email domain not allowed", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let receipt = state
        .verification
        .signup(&req.email, &req.display_name, req.credential.as_deref())
        .await?;

    let notification = match receipt.delivery {
        Delivery::Sent => "sent",
        Delivery::Failed(_) => "failed",
    };
    let response = SignupResponse {
        status: "pending_verification".to_string(),
        account_id: *receipt.account.id.as_uuid(),
        email: receipt.account.email.to_string(),
        code_expires_at: receipt.expires_at,
        notification: notification.to_string(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /accounts/resend` — Replace the pending code with a fresh one.
///
/// # Errors
///
/// Returns [`ServiceError`] for unknown or verified accounts, or when the
/// email could not be sent.
#[utoipa::path(
    post,
    path = "/api/v1/accounts/resend",
    tag = "Accounts",
    summary = "Resend verification code",
    description = "Issues a new code for an unverified account. The previous code stops working immediately.",
    request_body = ResendRequest,
    responses(
        (status = 200, description = "New code sent", body = ResendResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 409, description = "Account already verified", body = ErrorResponse),
        (status = 502, description = "Email could not be sent", body = ErrorResponse),
    )
)]
pub async fn resend(
    State(state): State<AppState>,
    Json(req): Json<ResendRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let receipt = state.verification.resend(&req.email).await?;
    if let Some(err) = receipt.notification_error() {
        return Err(err);
    }

    Ok(Json(ResendResponse {
        status: "sent".to_string(),
        code_expires_at: receipt.expires_at,
    }))
}

/// `POST /accounts/verify` — Submit a code.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidOrExpired`] for any code that does not
/// match an unexpired pending code.
#[utoipa::path(
    post,
    path = "/api/v1/accounts/verify",
    tag = "Accounts",
    summary = "Verify account",
    description = "Consumes the code and marks the account verified. Repeating the call on a verified account returns `already_verified`.",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Account verified", body = VerifyResponse),
        (status = 400, description = "Code invalid or expired", body = ErrorResponse),
    )
)]
pub async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let activation = state.verification.activate(&req.email, &req.code).await?;
    let status = match &activation {
        Activation::Verified(_) => "verified",
        Activation::AlreadyVerified(_) => "already_verified",
    };

    Ok(Json(VerifyResponse {
        status: status.to_string(),
        account: AccountDto::from(activation.account()),
    }))
}

/// `POST /accounts/login` — Sign in a verified member.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidCredentials`] or
/// [`ServiceError::VerificationRequired`].
#[utoipa::path(
    post,
    path = "/api/v1/accounts/login",
    tag = "Accounts",
    summary = "Log in",
    description = "Checks the credential (if the account has one), then requires the account to be verified.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login accepted", body = LoginResponse),
        (status = 401, description = "Unknown account or wrong credential", body = ErrorResponse),
        (status = 403, description = "Account not verified yet", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let account = state
        .sessions
        .authenticate(&req.email, req.credential.as_deref())
        .await?;

    Ok(Json(LoginResponse {
        account: AccountDto::from(&account),
    }))
}

/// Account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts/signup", post(signup))
        .route("/accounts/resend", post(resend))
        .route("/accounts/verify", post(verify))
        .route("/accounts/login", post(login))
}
