//! Borrowing and messaging handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{
    BorrowingHistoryDto, BorrowingRequestDto, CreateBorrowingRequest, MessageDto,
    RecordReturnRequest, SendMessageRequest,
};
use crate::app_state::AppState;
use crate::domain::{AccountId, ItemId, NewMessage, RequestId};
use crate::error::{ErrorResponse, ServiceError};

/// `POST /items/{id}/requests` — Ask to borrow an item.
///
/// # Errors
///
/// Returns [`ServiceError`] for unknown item or requester, or when the
/// owner requests their own item.
#[utoipa::path(
    post,
    path = "/api/v1/items/{id}/requests",
    tag = "Lending",
    summary = "Request to borrow",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = CreateBorrowingRequest,
    responses(
        (status = 201, description = "Request created; item is pending", body = BorrowingRequestDto),
        (status = 400, description = "Owner cannot borrow own item", body = ErrorResponse),
        (status = 404, description = "Item or requester not found", body = ErrorResponse),
    )
)]
pub async fn request_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateBorrowingRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = state
        .lending
        .request_item(ItemId::from_uuid(id), AccountId::from_uuid(req.requester_id))
        .await?;
    Ok((StatusCode::CREATED, Json(BorrowingRequestDto::from(request))))
}

/// `POST /requests/{id}/return` — Record that a borrowed item came back.
///
/// # Errors
///
/// Returns [`ServiceError`] for an unknown or already returned request.
#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/return",
    tag = "Lending",
    summary = "Record a return",
    params(("id" = Uuid, Path, description = "Borrowing request ID")),
    request_body = RecordReturnRequest,
    responses(
        (status = 201, description = "History recorded; item is available", body = BorrowingHistoryDto),
        (status = 404, description = "Request not found", body = ErrorResponse),
        (status = 409, description = "Already returned", body = ErrorResponse),
    )
)]
pub async fn record_return(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RecordReturnRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let history = state
        .lending
        .record_return(RequestId::from_uuid(id), req.return_date)
        .await?;
    Ok((StatusCode::CREATED, Json(BorrowingHistoryDto::from(history))))
}

/// `POST /messages` — Send a message to another member.
///
/// # Errors
///
/// Returns [`ServiceError`] on invalid content or unknown references.
#[utoipa::path(
    post,
    path = "/api/v1/messages",
    tag = "Lending",
    summary = "Send a message",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message stored", body = MessageDto),
        (status = 400, description = "Invalid content", body = ErrorResponse),
        (status = 404, description = "Account or item not found", body = ErrorResponse),
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let message = state
        .lending
        .send_message(NewMessage {
            sender_id: AccountId::from_uuid(req.sender_id),
            receiver_id: AccountId::from_uuid(req.receiver_id),
            item_id: req.item_id.map(ItemId::from_uuid),
            content: req.content,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(MessageDto::from(message))))
}

/// Borrowing and messaging routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/items/{id}/requests", post(request_item))
        .route("/requests/{id}/return", post(record_return))
        .route("/messages", post(send_message))
}
