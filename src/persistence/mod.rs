//! Persistence layer: account verification state and the lending tables.
//!
//! Two store traits describe what the services need from storage.
//! [`postgres::PostgresStore`] implements both on `sqlx::PgPool`;
//! [`memory::MemoryStore`] implements the same semantics behind a single
//! [`tokio::sync::RwLock`] and backs tests and persistence-disabled runs.
//!
//! Every method is one atomic unit: conditional updates are evaluated and
//! applied together, and multi-statement operations run inside one
//! transaction that rolls back when dropped uncommitted.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Account, AccountId, BorrowingHistory, BorrowingRequest, CodeReplacement, EmailAddress,
    IssuedCode, Item, ItemId, ItemPatch, Message, RetirementReport, VerificationCode,
};
use crate::error::ServiceError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Storage of member accounts and their verification state.
///
/// Only [`AccountStore::insert_pending_account`],
/// [`AccountStore::replace_code`] and [`AccountStore::consume_code`] write
/// the code, expiry and verified columns.
#[async_trait]
pub trait AccountStore: Send + Sync + fmt::Debug {
    /// Looks up an account by normalized email.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on storage failure.
    async fn find_account_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<Account>, ServiceError>;

    /// Looks up an account by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on storage failure.
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, ServiceError>;

    /// Inserts a new unverified account carrying its first code.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::AlreadyRegistered`] if the email is taken,
    /// [`ServiceError::Persistence`] on storage failure.
    async fn insert_pending_account(&self, account: &Account) -> Result<(), ServiceError>;

    /// Stores `issued` on the unverified account with this email, replacing
    /// any previous code. Verified accounts are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on storage failure.
    async fn replace_code(
        &self,
        email: &EmailAddress,
        issued: &IssuedCode,
    ) -> Result<CodeReplacement, ServiceError>;

    /// Marks the account verified and clears its code, but only if the
    /// stored code equals `code`, has not expired at `now`, and the account
    /// is still unverified. Returns the updated account, or `None` if the
    /// condition did not hold.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on storage failure.
    async fn consume_code(
        &self,
        email: &EmailAddress,
        code: &VerificationCode,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, ServiceError>;
}

/// Storage of items and the rows that depend on them.
#[async_trait]
pub trait LendingStore: Send + Sync + fmt::Debug {
    /// Inserts a new item.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::AccountNotFound`] if the owner does not exist,
    /// [`ServiceError::Persistence`] on storage failure.
    async fn insert_item(&self, item: &Item) -> Result<(), ServiceError>;

    /// Looks up an item by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on storage failure.
    async fn find_item(&self, id: ItemId) -> Result<Option<Item>, ServiceError>;

    /// Applies a validated, non-empty patch and returns the updated row.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ItemNotFound`] if no such item exists,
    /// [`ServiceError::Persistence`] on storage failure.
    async fn update_item(&self, id: ItemId, patch: &ItemPatch) -> Result<Item, ServiceError>;

    /// Inserts a borrowing request and marks an available item as pending.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ItemNotFound`] or
    /// [`ServiceError::AccountNotFound`] for dangling references,
    /// [`ServiceError::Persistence`] on storage failure.
    async fn insert_request(&self, request: &BorrowingRequest) -> Result<(), ServiceError>;

    /// Records the history row that finalizes a request and makes its item
    /// available again.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::RequestNotFound`] for an unknown request,
    /// [`ServiceError::AlreadyReturned`] if history already exists,
    /// [`ServiceError::Persistence`] on storage failure.
    async fn insert_history(&self, history: &BorrowingHistory) -> Result<(), ServiceError>;

    /// Inserts a message.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::AccountNotFound`] or
    /// [`ServiceError::ItemNotFound`] for dangling references,
    /// [`ServiceError::Persistence`] on storage failure.
    async fn insert_message(&self, message: &Message) -> Result<(), ServiceError>;

    /// Deletes the item together with its history, requests and messages in
    /// one transaction, in that leaf-to-root order.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ItemNotFound`] if the terminal item delete
    /// removes nothing, in which case no deletion is persisted;
    /// [`ServiceError::Persistence`] if any statement fails, also with full
    /// rollback.
    async fn retire_item(&self, id: ItemId) -> Result<RetirementReport, ServiceError>;
}
