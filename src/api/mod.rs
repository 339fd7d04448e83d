//! REST API layer: route handlers, DTOs, router composition and the
//! OpenAPI document.
//!
//! All endpoints are mounted under `/api/v1`.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::domain::ItemStatus;
use crate::error::{ErrorBody, ErrorResponse};

/// OpenAPI document for every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "borrowbox", description = "Peer-to-peer lending data service"),
    paths(
        handlers::account::signup,
        handlers::account::resend,
        handlers::account::verify,
        handlers::account::login,
        handlers::item::create_item,
        handlers::item::get_item,
        handlers::item::patch_item,
        handlers::item::retire_item,
        handlers::lending::request_item,
        handlers::lending::record_return,
        handlers::lending::send_message,
        handlers::system::health_handler,
    ),
    components(schemas(
        dto::SignupRequest,
        dto::SignupResponse,
        dto::ResendRequest,
        dto::ResendResponse,
        dto::VerifyRequest,
        dto::VerifyResponse,
        dto::LoginRequest,
        dto::LoginResponse,
        dto::AccountDto,
        dto::CreateItemRequest,
        dto::PatchItemRequest,
        dto::ItemDto,
        dto::RetireItemResponse,
        dto::CreateBorrowingRequest,
        dto::BorrowingRequestDto,
        dto::RecordReturnRequest,
        dto::BorrowingHistoryDto,
        dto::SendMessageRequest,
        dto::MessageDto,
        ItemStatus,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "Accounts", description = "Signup and email verification"),
        (name = "Items", description = "Listings and retirement"),
        (name = "Lending", description = "Borrowing requests, returns, messages"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new().nest("/api/v1", handlers::routes())
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::test_support::Harness;

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        let Ok(request) = request.body(body) else {
            panic!("request build failed");
        };
        let Ok(response) = app.clone().oneshot(request).await;
        let status = response.status();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body read failed");
        };
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn app(h: &Harness) -> Router {
        build_router().with_state(h.app_state())
    }

    #[tokio::test]
    async fn signup_verify_login_over_http() {
        let h = Harness::new();
        let app = app(&h);
        let email = "member@allowed.example";

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/accounts/signup",
            Some(json!({"email": email, "display_name": "Member"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "pending_verification");
        assert_eq!(body["notification"], "sent");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/accounts/login",
            Some(json!({"email": email})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["kind"], "verification_required");
        assert_eq!(body["error"]["details"], email);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/accounts/verify",
            Some(json!({"email": email, "code": "12345"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "invalid_or_expired");

        let code = h.notifier.last_code();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/accounts/verify",
            Some(json!({"email": email, "code": code})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "verified");
        assert!(body["account"].get("verification_code").is_none());

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/accounts/verify",
            Some(json!({"email": email, "code": "000000"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "already_verified");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/accounts/login",
            Some(json!({"email": email})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["account"]["is_verified"], true);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/accounts/resend",
            Some(json!({"email": email})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["kind"], "already_verified");
    }

    #[tokio::test]
    async fn signup_status_codes() {
        let h = Harness::new();
        let app = app(&h);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/accounts/signup",
            Some(json!({"email": "x@elsewhere.example", "display_name": "X"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["kind"], "domain_rejected");

        h.notifier.set_failing(true);
        let signup = json!({"email": "y@allowed.example", "display_name": "Y"});
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/accounts/signup",
            Some(signup.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["notification"], "failed");

        let (status, _) = call(&app, Method::POST, "/api/v1/accounts/signup", Some(signup)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/accounts/resend",
            Some(json!({"email": "y@allowed.example"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["kind"], "notification_failed");

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/v1/accounts/resend",
            Some(json!({"email": "nobody@allowed.example"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn item_lifecycle_and_retirement_over_http() {
        let h = Harness::new();
        let app = app(&h);
        let (Ok(owner), Ok(borrower)) = (
            h.verification.signup("owner@allowed.example", "Owner", None).await,
            h.verification.signup("borrower@allowed.example", "Borrower", None).await,
        ) else {
            panic!("signup failed");
        };
        let owner_id = owner.account.id.to_string();
        let borrower_id = borrower.account.id.to_string();

        let (status, item) = call(
            &app,
            Method::POST,
            "/api/v1/items",
            Some(json!({"owner_id": owner_id, "name": "Drill"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let Some(item_id) = item["item_id"].as_str().map(str::to_string) else {
            panic!("missing item_id");
        };
        let item_uri = format!("/api/v1/items/{item_id}");

        let (status, patched) = call(
            &app,
            Method::PATCH,
            &item_uri,
            Some(json!({"description": "cordless"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["description"], "cordless");

        let (status, _) = call(&app, Method::PATCH, &item_uri, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, request) = call(
            &app,
            Method::POST,
            &format!("{item_uri}/requests"),
            Some(json!({"requester_id": borrower_id})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let Some(request_id) = request["request_id"].as_str().map(str::to_string) else {
            panic!("missing request_id");
        };

        let (status, _) = call(
            &app,
            Method::POST,
            &format!("/api/v1/requests/{request_id}/return"),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/v1/messages",
            Some(json!({
                "sender_id": borrower_id,
                "receiver_id": owner_id,
                "item_id": item_id,
                "content": "Thanks!",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, report) = call(&app, Method::DELETE, &item_uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["status"], "deleted");
        assert_eq!(report["history_deleted"], 1);
        assert_eq!(report["requests_deleted"], 1);
        assert_eq!(report["messages_deleted"], 1);

        let (status, body) = call(&app, Method::DELETE, &item_uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["kind"], "not_found");

        let (status, _) = call(&app, Method::GET, &item_uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_is_served() {
        let h = Harness::new();
        let (status, body) = call(&app(&h), Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/accounts/signup",
            "/api/v1/accounts/verify",
            "/api/v1/items/{id}",
            "/api/v1/requests/{id}/return",
            "/api/v1/messages",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
