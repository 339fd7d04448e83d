//! Database row models and their conversion into domain types.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, CredentialHash, EmailAddress, Item, ItemId, ItemStatus,
};
use crate::error::ServiceError;

/// Column list shared by every query that returns an [`AccountRow`].
pub const ACCOUNT_COLUMNS: &str = "id, email, display_name, verification_code, code_expires_at, \
     is_verified, credential_hash, created_at";

/// Column list shared by every query that returns an [`ItemRow`].
pub const ITEM_COLUMNS: &str = "id, owner_id, name, description, status, created_at";

/// A row from the `accounts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    /// Primary key.
    pub id: Uuid,
    /// Normalized, unique email.
    pub email: String,
    /// Display name.
    pub display_name: String,
    /// Active code, if any.
    pub verification_code: Option<String>,
    /// Expiry of the active code.
    pub code_expires_at: Option<DateTime<Utc>>,
    /// Verification flag.
    pub is_verified: bool,
    /// Stored credential digest.
    pub credential_hash: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: AccountId::from_uuid(row.id),
            email: EmailAddress::from_normalized(row.email),
            display_name: row.display_name,
            verification_code: row.verification_code,
            code_expires_at: row.code_expires_at,
            is_verified: row.is_verified,
            credential_hash: row.credential_hash.map(CredentialHash::from_stored),
            created_at: row.created_at,
        }
    }
}

/// A row from the `items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning account.
    pub owner_id: Uuid,
    /// Title.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Status column value.
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for Item {
    type Error = ServiceError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let status: ItemStatus = row
            .status
            .parse()
            .map_err(|_| ServiceError::Persistence(format!("corrupt item status: {}", row.status)))?;
        Ok(Self {
            id: ItemId::from_uuid(row.id),
            owner_id: AccountId::from_uuid(row.owner_id),
            name: row.name,
            description: row.description,
            status,
            created_at: row.created_at,
        })
    }
}
