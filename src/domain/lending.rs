//! Rows that hang off an item: borrowing requests, their history, messages.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::ids::{AccountId, ItemId, MessageId, RequestId};

/// Longest accepted message body, in characters.
pub const MAX_MESSAGE_LEN: usize = 2_000;

/// A member's request to borrow an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowingRequest {
    /// Request identifier.
    pub id: RequestId,
    /// Account asking to borrow.
    pub requester_id: AccountId,
    /// Item being requested.
    pub item_id: ItemId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Finalization record of a borrowing request (1:1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowingHistory {
    /// The finalized request.
    pub request_id: RequestId,
    /// When the item came back, if it has.
    pub return_date: Option<DateTime<Utc>>,
}

/// A message between two members, optionally about an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message identifier.
    pub id: MessageId,
    /// Author.
    pub sender_id: AccountId,
    /// Recipient.
    pub receiver_id: AccountId,
    /// Item the conversation is about, if any.
    pub item_id: Option<ItemId>,
    /// Body text.
    pub content: String,
    /// Send timestamp.
    pub sent_at: DateTime<Utc>,
}

/// Validated input for a new message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// Author.
    pub sender_id: AccountId,
    /// Recipient.
    pub receiver_id: AccountId,
    /// Optional item scope.
    pub item_id: Option<ItemId>,
    /// Body text.
    pub content: String,
}

/// Rows removed by one item retirement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct RetirementReport {
    /// Borrowing history rows deleted.
    pub history_deleted: u64,
    /// Borrowing request rows deleted.
    pub requests_deleted: u64,
    /// Message rows deleted.
    pub messages_deleted: u64,
}
