//! In-memory store with the same atomicity as the PostgreSQL store.
//!
//! [`MemoryStore`] keeps every table behind one [`tokio::sync::RwLock`].
//! Each trait method holds the lock for its whole body and never awaits
//! anything else while holding it, so a conditional update or a retirement
//! is observed by other tasks either entirely or not at all.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{AccountStore, LendingStore};
use crate::domain::{
    Account, AccountId, BorrowingHistory, BorrowingRequest, CodeReplacement, EmailAddress,
    IssuedCode, Item, ItemId, ItemPatch, ItemStatus, Message, MessageId, RequestId,
    RetirementReport, VerificationCode,
};
use crate::error::ServiceError;

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    items: HashMap<ItemId, Item>,
    requests: HashMap<RequestId, BorrowingRequest>,
    history: HashMap<RequestId, BorrowingHistory>,
    messages: HashMap<MessageId, Message>,
}

impl Tables {
    fn account_by_email_mut(&mut self, email: &EmailAddress) -> Option<&mut Account> {
        self.accounts.values_mut().find(|a| &a.email == email)
    }
}

/// Row counts per table, for assertions and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    /// Rows in `accounts`.
    pub accounts: usize,
    /// Rows in `items`.
    pub items: usize,
    /// Rows in `borrowing_requests`.
    pub requests: usize,
    /// Rows in `borrowing_history`.
    pub history: usize,
    /// Rows in `messages`.
    pub messages: usize,
}

/// Process-local store used when persistence is disabled and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current number of rows in each table.
    pub async fn counts(&self) -> TableCounts {
        let tables = self.tables.read().await;
        TableCounts {
            accounts: tables.accounts.len(),
            items: tables.items.len(),
            requests: tables.requests.len(),
            history: tables.history.len(),
            messages: tables.messages.len(),
        }
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_account_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<Account>, ServiceError> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.values().find(|a| &a.email == email).cloned())
    }

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, ServiceError> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn insert_pending_account(&self, account: &Account) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        if tables.accounts.values().any(|a| a.email == account.email) {
            return Err(ServiceError::AlreadyRegistered);
        }
        tables.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn replace_code(
        &self,
        email: &EmailAddress,
        issued: &IssuedCode,
    ) -> Result<CodeReplacement, ServiceError> {
        let mut tables = self.tables.write().await;
        let Some(account) = tables.account_by_email_mut(email) else {
            return Ok(CodeReplacement::NotFound);
        };
        if account.is_verified {
            return Ok(CodeReplacement::AlreadyVerified);
        }
        account.verification_code = Some(issued.code.as_str().to_string());
        account.code_expires_at = Some(issued.expires_at);
        Ok(CodeReplacement::Replaced(account.clone()))
    }

    async fn consume_code(
        &self,
        email: &EmailAddress,
        code: &VerificationCode,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, ServiceError> {
        let mut tables = self.tables.write().await;
        let Some(account) = tables.account_by_email_mut(email) else {
            return Ok(None);
        };
        let matches = !account.is_verified
            && account.verification_code.as_deref() == Some(code.as_str())
            && account
                .code_expires_at
                .is_some_and(|expires_at| IssuedCode::is_live_at(expires_at, now));
        if !matches {
            return Ok(None);
        }
        account.is_verified = true;
        account.verification_code = None;
        account.code_expires_at = None;
        Ok(Some(account.clone()))
    }
}

#[async_trait]
impl LendingStore for MemoryStore {
    async fn insert_item(&self, item: &Item) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(&item.owner_id) {
            return Err(ServiceError::AccountNotFound);
        }
        tables.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn find_item(&self, id: ItemId) -> Result<Option<Item>, ServiceError> {
        Ok(self.tables.read().await.items.get(&id).cloned())
    }

    async fn update_item(&self, id: ItemId, patch: &ItemPatch) -> Result<Item, ServiceError> {
        let mut tables = self.tables.write().await;
        let item = tables
            .items
            .get_mut(&id)
            .ok_or(ServiceError::ItemNotFound(*id.as_uuid()))?;
        patch.apply_to(item);
        Ok(item.clone())
    }

    async fn insert_request(&self, request: &BorrowingRequest) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(&request.requester_id) {
            return Err(ServiceError::AccountNotFound);
        }
        let item = tables
            .items
            .get_mut(&request.item_id)
            .ok_or(ServiceError::ItemNotFound(*request.item_id.as_uuid()))?;
        if item.status == ItemStatus::Available {
            item.status = ItemStatus::Pending;
        }
        tables.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn insert_history(&self, history: &BorrowingHistory) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        let request_id = history.request_id;
        let Some(item_id) = tables.requests.get(&request_id).map(|r| r.item_id) else {
            return Err(ServiceError::RequestNotFound(*request_id.as_uuid()));
        };
        if tables.history.contains_key(&request_id) {
            return Err(ServiceError::AlreadyReturned(*request_id.as_uuid()));
        }
        tables.history.insert(request_id, history.clone());
        if let Some(item) = tables.items.get_mut(&item_id) {
            item.status = ItemStatus::Available;
        }
        Ok(())
    }

    async fn insert_message(&self, message: &Message) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(&message.sender_id)
            || !tables.accounts.contains_key(&message.receiver_id)
        {
            return Err(ServiceError::AccountNotFound);
        }
        if let Some(item_id) = message.item_id
            && !tables.items.contains_key(&item_id)
        {
            return Err(ServiceError::ItemNotFound(*item_id.as_uuid()));
        }
        tables.messages.insert(message.id, message.clone());
        Ok(())
    }

    async fn retire_item(&self, id: ItemId) -> Result<RetirementReport, ServiceError> {
        let mut tables = self.tables.write().await;

        // Stage every deletion first; nothing is applied unless the item
        // itself exists.
        let request_ids: Vec<RequestId> = tables
            .requests
            .values()
            .filter(|r| r.item_id == id)
            .map(|r| r.id)
            .collect();
        let history_ids: Vec<RequestId> = request_ids
            .iter()
            .copied()
            .filter(|rid| tables.history.contains_key(rid))
            .collect();
        let message_ids: Vec<MessageId> = tables
            .messages
            .values()
            .filter(|m| m.item_id == Some(id))
            .map(|m| m.id)
            .collect();

        if !tables.items.contains_key(&id) {
            return Err(ServiceError::ItemNotFound(*id.as_uuid()));
        }

        for rid in &history_ids {
            tables.history.remove(rid);
        }
        for rid in &request_ids {
            tables.requests.remove(rid);
        }
        for mid in &message_ids {
            tables.messages.remove(mid);
        }
        tables.items.remove(&id);

        Ok(RetirementReport {
            history_deleted: history_ids.len() as u64,
            requests_deleted: request_ids.len() as u64,
            messages_deleted: message_ids.len() as u64,
        })
    }
}
