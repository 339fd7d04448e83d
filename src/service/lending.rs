//! Listings, borrowing requests, returns and messages.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::SharedClock;
use crate::domain::item::{normalize_description, validate_item_name};
use crate::domain::lending::MAX_MESSAGE_LEN;
use crate::domain::{
    AccountId, BorrowingHistory, BorrowingRequest, Item, ItemId, ItemPatch, ItemStatus, Message,
    MessageId, NewItem, NewMessage, RequestId,
};
use crate::error::ServiceError;
use crate::persistence::{AccountStore, LendingStore};

/// Single-statement lending operations.
///
/// Each method validates its input, then performs one store call.
pub struct LendingService {
    store: Arc<dyn LendingStore>,
    accounts: Arc<dyn AccountStore>,
    clock: SharedClock,
}

impl std::fmt::Debug for LendingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LendingService")
            .field("store", &self.store)
            .field("accounts", &self.accounts)
            .finish_non_exhaustive()
    }
}

impl LendingService {
    /// Creates a new `LendingService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn LendingStore>,
        accounts: Arc<dyn AccountStore>,
        clock: SharedClock,
    ) -> Self {
        Self {
            store,
            accounts,
            clock,
        }
    }

    /// Lists a new item as available.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] for a blank or overlong name,
    /// [`ServiceError::AccountNotFound`] if the owner does not exist.
    pub async fn create_item(&self, new: NewItem) -> Result<Item, ServiceError> {
        let item = Item {
            id: ItemId::new(),
            owner_id: new.owner_id,
            name: validate_item_name(&new.name)?,
            description: normalize_description(new.description),
            status: ItemStatus::Available,
            created_at: self.clock.utc(),
        };
        self.store.insert_item(&item).await?;
        tracing::info!(item_id = %item.id, owner_id = %item.owner_id, "item listed");
        Ok(item)
    }

    /// Fetches an item.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ItemNotFound`] if it does not exist.
    pub async fn get_item(&self, id: ItemId) -> Result<Item, ServiceError> {
        self.store
            .find_item(id)
            .await?
            .ok_or(ServiceError::ItemNotFound(*id.as_uuid()))
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] for an empty or invalid
    /// patch, [`ServiceError::ItemNotFound`] if the item does not exist.
    pub async fn update_item(&self, id: ItemId, patch: ItemPatch) -> Result<Item, ServiceError> {
        let patch = patch.validated()?;
        let item = self.store.update_item(id, &patch).await?;
        tracing::debug!(item_id = %id, fields = patch.assignments().len(), "item updated");
        Ok(item)
    }

    /// Asks to borrow an item. The item becomes `pending` if it was
    /// available.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ItemNotFound`] or
    /// [`ServiceError::AccountNotFound`] for unknown references, and
    /// [`ServiceError::InvalidRequest`] when the owner requests their own
    /// item.
    pub async fn request_item(
        &self,
        item_id: ItemId,
        requester_id: AccountId,
    ) -> Result<BorrowingRequest, ServiceError> {
        let item = self.get_item(item_id).await?;
        if item.owner_id == requester_id {
            return Err(ServiceError::InvalidRequest(
                "owners cannot borrow their own items".to_string(),
            ));
        }

        let request = BorrowingRequest {
            id: RequestId::new(),
            requester_id,
            item_id,
            created_at: self.clock.utc(),
        };
        self.store.insert_request(&request).await?;
        tracing::info!(request_id = %request.id, %item_id, %requester_id, "borrowing requested");
        Ok(request)
    }

    /// Finalizes a request with its history row. Defaults the return date
    /// to now.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::RequestNotFound`] for an unknown request,
    /// [`ServiceError::AlreadyReturned`] if it was already finalized.
    pub async fn record_return(
        &self,
        request_id: RequestId,
        return_date: Option<DateTime<Utc>>,
    ) -> Result<BorrowingHistory, ServiceError> {
        let history = BorrowingHistory {
            request_id,
            return_date: Some(return_date.unwrap_or_else(|| self.clock.utc())),
        };
        self.store.insert_history(&history).await?;
        tracing::info!(%request_id, "return recorded");
        Ok(history)
    }

    /// Sends a message between two members, optionally about an item.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] for blank, overlong or
    /// self-addressed messages, [`ServiceError::AccountNotFound`] /
    /// [`ServiceError::ItemNotFound`] for unknown references.
    pub async fn send_message(&self, new: NewMessage) -> Result<Message, ServiceError> {
        let content = new.content.trim();
        if content.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "message content is required".to_string(),
            ));
        }
        if content.chars().count() > MAX_MESSAGE_LEN {
            return Err(ServiceError::InvalidRequest(format!(
                "message exceeds {MAX_MESSAGE_LEN} characters"
            )));
        }
        if new.sender_id == new.receiver_id {
            return Err(ServiceError::InvalidRequest(
                "sender and receiver must differ".to_string(),
            ));
        }
        if self.accounts.find_account(new.receiver_id).await?.is_none() {
            return Err(ServiceError::AccountNotFound);
        }

        let message = Message {
            id: MessageId::new(),
            sender_id: new.sender_id,
            receiver_id: new.receiver_id,
            item_id: new.item_id,
            content: content.to_string(),
            sent_at: self.clock.utc(),
        };
        self.store.insert_message(&message).await?;
        tracing::debug!(message_id = %message.id, "message sent");
        Ok(message)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use mockable::Clock;

    use crate::test_support::Harness;

    struct Fixture {
        h: Harness,
        lending: LendingService,
        owner: AccountId,
        borrower: AccountId,
    }

    async fn fixture() -> Fixture {
        let h = Harness::new();
        let (Ok(owner), Ok(borrower)) = (
            h.verification.signup("owner@allowed.example", "Owner", None).await,
            h.verification.signup("borrower@allowed.example", "Borrower", None).await,
        ) else {
            panic!("signup failed");
        };
        let lending = LendingService::new(
            Arc::clone(&h.store) as _,
            Arc::clone(&h.store) as _,
            Arc::clone(&h.clock) as _,
        );
        Fixture {
            h,
            lending,
            owner: owner.account.id,
            borrower: borrower.account.id,
        }
    }

    async fn listed(f: &Fixture) -> Item {
        let Ok(item) = f
            .lending
            .create_item(NewItem {
                owner_id: f.owner,
                name: "  Ladder ".to_string(),
                description: Some("   ".to_string()),
            })
            .await
        else {
            panic!("create failed");
        };
        item
    }

    #[tokio::test]
    async fn create_item_normalizes_input() {
        let f = fixture().await;
        let item = listed(&f).await;
        assert_eq!(item.name, "Ladder");
        assert_eq!(item.description, None);
        assert_eq!(item.status, ItemStatus::Available);
        assert_eq!(item.created_at, f.h.clock.utc());

        let Ok(fetched) = f.lending.get_item(item.id).await else {
            panic!("item not found");
        };
        assert_eq!(fetched, item);
    }

    #[tokio::test]
    async fn create_item_requires_existing_owner() {
        let f = fixture().await;
        let result = f
            .lending
            .create_item(NewItem {
                owner_id: AccountId::new(),
                name: "Tent".to_string(),
                description: None,
            })
            .await;
        assert!(matches!(result, Err(ServiceError::AccountNotFound)));
    }

    #[tokio::test]
    async fn get_missing_item_is_not_found() {
        let f = fixture().await;
        let result = f.lending.get_item(ItemId::new()).await;
        assert!(matches!(result, Err(ServiceError::ItemNotFound(_))));
    }

    #[tokio::test]
    async fn update_item_applies_patch() {
        let f = fixture().await;
        let item = listed(&f).await;

        let empty = f.lending.update_item(item.id, ItemPatch::default()).await;
        assert!(matches!(empty, Err(ServiceError::InvalidRequest(_))));

        let patch = ItemPatch {
            description: Some(Some("aluminium, 3m".to_string())),
            status: Some(ItemStatus::Borrowed),
            ..ItemPatch::default()
        };
        let Ok(updated) = f.lending.update_item(item.id, patch).await else {
            panic!("update failed");
        };
        assert_eq!(updated.name, "Ladder");
        assert_eq!(updated.description.as_deref(), Some("aluminium, 3m"));
        assert_eq!(updated.status, ItemStatus::Borrowed);

        let missing = f
            .lending
            .update_item(
                ItemId::new(),
                ItemPatch {
                    name: Some("x".to_string()),
                    ..ItemPatch::default()
                },
            )
            .await;
        assert!(matches!(missing, Err(ServiceError::ItemNotFound(_))));
    }

    #[tokio::test]
    async fn request_and_return_cycle_item_status() {
        let f = fixture().await;
        let item = listed(&f).await;

        let own = f.lending.request_item(item.id, f.owner).await;
        assert!(matches!(own, Err(ServiceError::InvalidRequest(_))));

        let Ok(request) = f.lending.request_item(item.id, f.borrower).await else {
            panic!("request failed");
        };
        let Ok(pending) = f.lending.get_item(item.id).await else {
            panic!("item vanished");
        };
        assert_eq!(pending.status, ItemStatus::Pending);

        let Ok(history) = f.lending.record_return(request.id, None).await else {
            panic!("return failed");
        };
        assert_eq!(history.return_date, Some(f.h.clock.utc()));
        let again = f.lending.record_return(request.id, None).await;
        assert!(matches!(again, Err(ServiceError::AlreadyReturned(_))));

        let Ok(available) = f.lending.get_item(item.id).await else {
            panic!("item vanished");
        };
        assert_eq!(available.status, ItemStatus::Available);
    }

    #[tokio::test]
    async fn return_for_unknown_request_is_not_found() {
        let f = fixture().await;
        let result = f.lending.record_return(RequestId::new(), None).await;
        assert!(matches!(result, Err(ServiceError::RequestNotFound(_))));
    }

    #[tokio::test]
    async fn send_message_validates_content_and_parties() {
        let f = fixture().await;
        let item = listed(&f).await;
        let message = |content: &str, receiver: AccountId| NewMessage {
            sender_id: f.borrower,
            receiver_id: receiver,
            item_id: Some(item.id),
            content: content.to_string(),
        };

        let blank = f.lending.send_message(message("  ", f.owner)).await;
        assert!(matches!(blank, Err(ServiceError::InvalidRequest(_))));

        let long = "x".repeat(MAX_MESSAGE_LEN + 1);
        let overlong = f.lending.send_message(message(&long, f.owner)).await;
        assert!(matches!(overlong, Err(ServiceError::InvalidRequest(_))));

        let to_self = f.lending.send_message(message("hi", f.borrower)).await;
        assert!(matches!(to_self, Err(ServiceError::InvalidRequest(_))));

        let stranger = f.lending.send_message(message("hi", AccountId::new())).await;
        assert!(matches!(stranger, Err(ServiceError::AccountNotFound)));

        let Ok(sent) = f.lending.send_message(message(" Still free? ", f.owner)).await else {
            panic!("send failed");
        };
        assert_eq!(sent.content, "Still free?");
        assert_eq!(f.h.store.counts().await.messages, 1);
    }
}
