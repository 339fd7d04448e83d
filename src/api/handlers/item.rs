//! Item handlers: create, get, patch, retire.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{CreateItemRequest, ItemDto, PatchItemRequest, RetireItemResponse};
use crate::app_state::AppState;
use crate::domain::{AccountId, ItemId, NewItem};
use crate::error::{ErrorResponse, ServiceError};

/// `POST /items` — List a new item.
///
/// # Errors
///
/// Returns [`ServiceError`] on invalid input or an unknown owner.
#[utoipa::path(
    post,
    path = "/api/v1/items",
    tag = "Items",
    summary = "Create an item",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item listed", body = ItemDto),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Owner not found", body = ErrorResponse),
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    Json(req): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state
        .lending
        .create_item(NewItem {
            owner_id: AccountId::from_uuid(req.owner_id),
            name: req.name,
            description: req.description,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ItemDto::from(item))))
}

/// `GET /items/{id}` — Fetch an item.
///
/// # Errors
///
/// Returns [`ServiceError::ItemNotFound`] if it does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    tag = "Items",
    summary = "Get an item",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item", body = ItemDto),
        (status = 404, description = "Item not found", body = ErrorResponse),
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state.lending.get_item(ItemId::from_uuid(id)).await?;
    Ok(Json(ItemDto::from(item)))
}

/// `PATCH /items/{id}` — Update name, description or status.
///
/// # Errors
///
/// Returns [`ServiceError`] for an empty or invalid patch or a missing item.
#[utoipa::path(
    patch,
    path = "/api/v1/items/{id}",
    tag = "Items",
    summary = "Update an item",
    description = "Partial update. Only `name`, `description` and `status` may be set; at least one is required.",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = PatchItemRequest,
    responses(
        (status = 200, description = "Updated item", body = ItemDto),
        (status = 400, description = "Empty or invalid patch", body = ErrorResponse),
        (status = 404, description = "Item not found", body = ErrorResponse),
    )
)]
pub async fn patch_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<PatchItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state
        .lending
        .update_item(ItemId::from_uuid(id), req.into())
        .await?;
    Ok(Json(ItemDto::from(item)))
}

/// `DELETE /items/{id}` — Retire an item with its requests, history and
/// messages.
///
/// # Errors
///
/// Returns [`ServiceError::ItemNotFound`] if it does not exist, or
/// [`ServiceError::Persistence`] if the cascade was rolled back.
#[utoipa::path(
    delete,
    path = "/api/v1/items/{id}",
    tag = "Items",
    summary = "Retire an item",
    description = "Deletes the item and every borrowing request, borrowing history row and message that references it, in one transaction.",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item retired", body = RetireItemResponse),
        (status = 404, description = "Item not found", body = ErrorResponse),
        (status = 500, description = "Cascade rolled back", body = ErrorResponse),
    )
)]
pub async fn retire_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let item_id = ItemId::from_uuid(id);
    let report = state.retirement.retire_item(item_id).await?;
    Ok(Json(RetireItemResponse::deleted(item_id, report)))
}

/// Item routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/items", post(create_item))
        .route(
            "/items/{id}",
            get(get_item).patch(patch_item).delete(retire_item),
        )
}
