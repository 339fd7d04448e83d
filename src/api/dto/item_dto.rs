//! Item, borrowing and message DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{
    BorrowingHistory, BorrowingRequest, Item, ItemId, ItemPatch, ItemStatus, Message,
    RetirementReport,
};

/// Request body for `POST /items`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateItemRequest {
    /// Owning account.
    pub owner_id: Uuid,
    /// Item name (max 200 chars).
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Request body for `PATCH /items/{id}`.
///
/// Absent fields are left unchanged. `description: null` clears the
/// description. Unknown fields are rejected.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PatchItemRequest {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description; `null` clears it.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    /// New status.
    #[serde(default)]
    pub status: Option<ItemStatus>,
}

/// Maps a present field (even `null`) to `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<PatchItemRequest> for ItemPatch {
    fn from(req: PatchItemRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            status: req.status,
        }
    }
}

/// Item representation.
#[derive(Debug, Serialize, ToSchema)]
pub struct ItemDto {
    /// Item identifier.
    pub item_id: Uuid,
    /// Owning account.
    pub owner_id: Uuid,
    /// Item name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Lending status.
    pub status: ItemStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Item> for ItemDto {
    fn from(item: Item) -> Self {
        Self {
            item_id: *item.id.as_uuid(),
            owner_id: *item.owner_id.as_uuid(),
            name: item.name,
            description: item.description,
            status: item.status,
            created_at: item.created_at,
        }
    }
}

/// Response body for `DELETE /items/{id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RetireItemResponse {
    /// Always `deleted`.
    pub status: String,
    /// The retired item.
    pub item_id: Uuid,
    /// Borrowing history rows removed.
    pub history_deleted: u64,
    /// Borrowing request rows removed.
    pub requests_deleted: u64,
    /// Message rows removed.
    pub messages_deleted: u64,
}

impl RetireItemResponse {
    /// Builds the response for a completed retirement.
    #[must_use]
    pub fn deleted(item_id: ItemId, report: RetirementReport) -> Self {
        Self {
            status: "deleted".to_string(),
            item_id: *item_id.as_uuid(),
            history_deleted: report.history_deleted,
            requests_deleted: report.requests_deleted,
            messages_deleted: report.messages_deleted,
        }
    }
}

/// Request body for `POST /items/{id}/requests`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBorrowingRequest {
    /// Account asking to borrow.
    pub requester_id: Uuid,
}

/// Borrowing request representation.
#[derive(Debug, Serialize, ToSchema)]
pub struct BorrowingRequestDto {
    /// Request identifier.
    pub request_id: Uuid,
    /// Requested item.
    pub item_id: Uuid,
    /// Requesting account.
    pub requester_id: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<BorrowingRequest> for BorrowingRequestDto {
    fn from(request: BorrowingRequest) -> Self {
        Self {
            request_id: *request.id.as_uuid(),
            item_id: *request.item_id.as_uuid(),
            requester_id: *request.requester_id.as_uuid(),
            created_at: request.created_at,
        }
    }
}

/// Request body for `POST /requests/{id}/return`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RecordReturnRequest {
    /// Return time; defaults to now.
    #[serde(default)]
    pub return_date: Option<DateTime<Utc>>,
}

/// Borrowing history representation.
#[derive(Debug, Serialize, ToSchema)]
pub struct BorrowingHistoryDto {
    /// The finalized request.
    pub request_id: Uuid,
    /// When the item came back.
    pub return_date: Option<DateTime<Utc>>,
}

impl From<BorrowingHistory> for BorrowingHistoryDto {
    fn from(history: BorrowingHistory) -> Self {
        Self {
            request_id: *history.request_id.as_uuid(),
            return_date: history.return_date,
        }
    }
}

/// Request body for `POST /messages`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    /// Author.
    pub sender_id: Uuid,
    /// Recipient.
    pub receiver_id: Uuid,
    /// Optional item the message is about.
    #[serde(default)]
    pub item_id: Option<Uuid>,
    /// Body text (max 2000 chars).
    pub content: String,
}

/// Message representation.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageDto {
    /// Message identifier.
    pub message_id: Uuid,
    /// Author.
    pub sender_id: Uuid,
    /// Recipient.
    pub receiver_id: Uuid,
    /// Item scope.
    pub item_id: Option<Uuid>,
    /// Body text.
    pub content: String,
    /// Send timestamp.
    pub sent_at: DateTime<Utc>,
}

impl From<Message> for MessageDto {
    fn from(message: Message) -> Self {
        Self {
            message_id: *message.id.as_uuid(),
            sender_id: *message.sender_id.as_uuid(),
            receiver_id: *message.receiver_id.as_uuid(),
            item_id: message.item_id.map(|id| *id.as_uuid()),
            content: message.content,
            sent_at: message.sent_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn patch(json: &str) -> ItemPatch {
        let Ok(req) = serde_json::from_str::<PatchItemRequest>(json) else {
            panic!("patch rejected: {json}");
        };
        req.into()
    }

    #[test]
    fn absent_and_null_description_differ() {
        assert_eq!(patch(r#"{"name":"Saw"}"#).description, None);
        assert_eq!(patch(r#"{"description":null}"#).description, Some(None));
        assert_eq!(
            patch(r#"{"description":"sharp"}"#).description,
            Some(Some("sharp".to_string()))
        );
    }

    #[test]
    fn unknown_patch_fields_are_rejected() {
        assert!(serde_json::from_str::<PatchItemRequest>(r#"{"owner_id":"x"}"#).is_err());
        assert!(serde_json::from_str::<PatchItemRequest>(r#"{"status":"lost"}"#).is_err());
    }

    #[test]
    fn status_uses_snake_case() {
        assert_eq!(patch(r#"{"status":"borrowed"}"#).status, Some(ItemStatus::Borrowed));
    }
}
