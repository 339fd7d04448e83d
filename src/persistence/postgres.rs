//! PostgreSQL implementation of the store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{ACCOUNT_COLUMNS, AccountRow, ITEM_COLUMNS, ItemRow};
use super::{AccountStore, LendingStore};
use crate::domain::item::FieldValue;
use crate::domain::{
    Account, AccountId, BorrowingHistory, BorrowingRequest, CodeReplacement, EmailAddress,
    IssuedCode, Item, ItemId, ItemPatch, ItemStatus, Message, RetirementReport, VerificationCode,
};
use crate::error::ServiceError;

/// Foreign key from `borrowing_requests.item_id` to `items`.
const FK_REQUEST_ITEM: &str = "borrowing_requests_item_id_fkey";
/// Foreign key from `messages.item_id` to `items`.
const FK_MESSAGE_ITEM: &str = "messages_item_id_fkey";

/// PostgreSQL-backed store using `sqlx::PgPool`.
///
/// The pool is opened by the caller at startup and handed in here; call
/// [`PostgresStore::close`] during shutdown.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies pending migrations from `migrations/`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), ServiceError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| ServiceError::Persistence(e.to_string()))
    }

    /// Closes every connection in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Name of the constraint a database error violated, if any.
fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    err.as_database_error().and_then(|db| db.constraint())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}

/// Builds the parameterized `UPDATE` for an item patch. Column names come
/// from the closed [`crate::domain::item::ItemField`] set; every value is a
/// bind parameter.
pub(crate) fn item_update_query(id: ItemId, patch: &ItemPatch) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE items SET ");
    {
        let mut set = qb.separated(", ");
        for (field, value) in patch.assignments() {
            set.push(field.column());
            set.push_unseparated(" = ");
            match value {
                FieldValue::Text(text) => set.push_bind_unseparated(text),
                FieldValue::Status(status) => set.push_bind_unseparated(status.as_str()),
            };
        }
    }
    qb.push(" WHERE id = ");
    qb.push_bind(*id.as_uuid());
    qb.push(" RETURNING ");
    qb.push(ITEM_COLUMNS);
    qb
}

#[async_trait]
impl AccountStore for PostgresStore {
    async fn find_account_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<Account>, ServiceError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Account::from))
    }

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, ServiceError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Account::from))
    }

    async fn insert_pending_account(&self, account: &Account) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO accounts (id, email, display_name, verification_code, code_expires_at, \
             is_verified, credential_hash, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(account.id.as_uuid())
        .bind(account.email.as_str())
        .bind(&account.display_name)
        .bind(account.verification_code.as_deref())
        .bind(account.code_expires_at)
        .bind(account.is_verified)
        .bind(account.credential_hash.as_ref().map(|h| h.as_str()))
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::AlreadyRegistered
            } else {
                ServiceError::from(e)
            }
        })?;

        Ok(())
    }

    async fn replace_code(
        &self,
        email: &EmailAddress,
        issued: &IssuedCode,
    ) -> Result<CodeReplacement, ServiceError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "UPDATE accounts SET verification_code = $2, code_expires_at = $3 \
             WHERE email = $1 AND is_verified = FALSE \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(email.as_str())
        .bind(issued.code.as_str())
        .bind(issued.expires_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(CodeReplacement::Replaced(Account::from(row)));
        }

        match self.find_account_by_email(email).await? {
            Some(account) if account.is_verified => Ok(CodeReplacement::AlreadyVerified),
            _ => Ok(CodeReplacement::NotFound),
        }
    }

    async fn consume_code(
        &self,
        email: &EmailAddress,
        code: &VerificationCode,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, ServiceError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "UPDATE accounts \
             SET is_verified = TRUE, verification_code = NULL, code_expires_at = NULL \
             WHERE email = $1 AND is_verified = FALSE \
               AND verification_code = $2 AND code_expires_at > $3 \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(email.as_str())
        .bind(code.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Account::from))
    }
}

#[async_trait]
impl LendingStore for PostgresStore {
    async fn insert_item(&self, item: &Item) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO items (id, owner_id, name, description, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(item.id.as_uuid())
        .bind(item.owner_id.as_uuid())
        .bind(&item.name)
        .bind(item.description.as_deref())
        .bind(item.status.as_str())
        .bind(item.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                ServiceError::AccountNotFound
            } else {
                ServiceError::from(e)
            }
        })?;

        Ok(())
    }

    async fn find_item(&self, id: ItemId) -> Result<Option<Item>, ServiceError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Item::try_from).transpose()
    }

    async fn update_item(&self, id: ItemId, patch: &ItemPatch) -> Result<Item, ServiceError> {
        let mut qb = item_update_query(id, patch);
        let row = qb
            .build_query_as::<ItemRow>()
            .fetch_optional(&self.pool)
            .await?;

        row.map(Item::try_from)
            .transpose()?
            .ok_or(ServiceError::ItemNotFound(*id.as_uuid()))
    }

    async fn insert_request(&self, request: &BorrowingRequest) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO borrowing_requests (id, requester_id, item_id, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(request.id.as_uuid())
        .bind(request.requester_id.as_uuid())
        .bind(request.item_id.as_uuid())
        .bind(request.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if violated_constraint(&e) == Some(FK_REQUEST_ITEM) {
                ServiceError::ItemNotFound(*request.item_id.as_uuid())
            } else if is_foreign_key_violation(&e) {
                ServiceError::AccountNotFound
            } else {
                ServiceError::from(e)
            }
        })?;

        sqlx::query("UPDATE items SET status = $2 WHERE id = $1 AND status = $3")
            .bind(request.item_id.as_uuid())
            .bind(ItemStatus::Pending.as_str())
            .bind(ItemStatus::Available.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_history(&self, history: &BorrowingHistory) -> Result<(), ServiceError> {
        let request_id = *history.request_id.as_uuid();
        let mut tx = self.pool.begin().await?;

        // Item row first, matching the lock order of retire_item.
        let item_id: Uuid = sqlx::query_scalar(
            "SELECT i.id FROM items i \
             JOIN borrowing_requests r ON r.item_id = i.id \
             WHERE r.id = $1 FOR UPDATE OF i",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ServiceError::RequestNotFound(request_id))?;

        sqlx::query("INSERT INTO borrowing_history (request_id, return_date) VALUES ($1, $2)")
            .bind(request_id)
            .bind(history.return_date)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ServiceError::AlreadyReturned(request_id)
                } else if is_foreign_key_violation(&e) {
                    ServiceError::RequestNotFound(request_id)
                } else {
                    ServiceError::from(e)
                }
            })?;

        sqlx::query("UPDATE items SET status = $2 WHERE id = $1")
            .bind(item_id)
            .bind(ItemStatus::Available.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_message(&self, message: &Message) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO messages (id, sender_id, receiver_id, item_id, content, sent_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(message.id.as_uuid())
        .bind(message.sender_id.as_uuid())
        .bind(message.receiver_id.as_uuid())
        .bind(message.item_id.map(Uuid::from))
        .bind(&message.content)
        .bind(message.sent_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match message.item_id {
            Some(item_id) if violated_constraint(&e) == Some(FK_MESSAGE_ITEM) => {
                ServiceError::ItemNotFound(item_id.into())
            }
            _ if is_foreign_key_violation(&e) => ServiceError::AccountNotFound,
            _ => ServiceError::from(e),
        })?;

        Ok(())
    }

    async fn retire_item(&self, id: ItemId) -> Result<RetirementReport, ServiceError> {
        let item_id = *id.as_uuid();
        let mut tx = self.pool.begin().await?;

        // Blocks concurrent request inserts for this item until commit.
        sqlx::query("SELECT id FROM items WHERE id = $1 FOR UPDATE")
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await?;

        let request_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM borrowing_requests WHERE item_id = $1")
                .bind(item_id)
                .fetch_all(&mut *tx)
                .await?;

        let history_deleted =
            sqlx::query("DELETE FROM borrowing_history WHERE request_id = ANY($1)")
                .bind(request_ids.as_slice())
                .execute(&mut *tx)
                .await?
                .rows_affected();

        let requests_deleted = sqlx::query("DELETE FROM borrowing_requests WHERE item_id = $1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let messages_deleted = sqlx::query("DELETE FROM messages WHERE item_id = $1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let items_deleted = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if items_deleted == 0 {
            tx.rollback().await?;
            return Err(ServiceError::ItemNotFound(item_id));
        }

        tx.commit().await?;

        Ok(RetirementReport {
            history_deleted,
            requests_deleted,
            messages_deleted,
        })
    }
}
