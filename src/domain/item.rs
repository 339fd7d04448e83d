//! Listed items and the typed partial-update patch.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::{AccountId, ItemId};
use crate::error::ServiceError;

/// Longest accepted item name, in characters.
pub const MAX_ITEM_NAME_LEN: usize = 200;

/// Lending status of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Free to be requested.
    Available,
    /// Currently lent out.
    Borrowed,
    /// A borrowing request is awaiting the owner's decision.
    Pending,
}

impl ItemStatus {
    /// Returns the column value stored in the `items.status` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Borrowed => "borrowed",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "borrowed" => Ok(Self::Borrowed),
            "pending" => Ok(Self::Pending),
            other => Err(ServiceError::InvalidRequest(format!(
                "unknown item status: {other}"
            ))),
        }
    }
}

/// An item row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Item identifier.
    pub id: ItemId,
    /// Owning account.
    pub owner_id: AccountId,
    /// Short title.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Current lending status.
    pub status: ItemStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Validated input for a new listing.
#[derive(Debug, Clone)]
pub struct NewItem {
    /// Owning account.
    pub owner_id: AccountId,
    /// Short title.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
}

/// Names of the columns an [`ItemPatch`] may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    /// `items.name`
    Name,
    /// `items.description`
    Description,
    /// `items.status`
    Status,
}

impl ItemField {
    /// Column name in the `items` table.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Status => "status",
        }
    }
}

/// A new value for one patchable column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Replacement text. `None` clears a nullable column.
    Text(Option<String>),
    /// Replacement status.
    Status(ItemStatus),
}

/// Partial update of an item: each present field replaces the stored value.
///
/// The set of fields is closed; the storage layer turns the patch into one
/// parameterized `UPDATE`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    /// New name.
    pub name: Option<String>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// New status.
    pub status: Option<ItemStatus>,
}

impl ItemPatch {
    /// Returns `true` if the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.status.is_none()
    }

    /// Validates and normalizes field values.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] if the patch is empty or a
    /// new name is blank or too long.
    pub fn validated(self) -> Result<Self, ServiceError> {
        if self.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "patch must set at least one field".to_string(),
            ));
        }
        let name = self.name.map(|n| validate_item_name(&n)).transpose()?;
        let description = self.description.map(normalize_description);
        Ok(Self {
            name,
            description,
            status: self.status,
        })
    }

    /// Lists the present fields with their new values, in column order.
    #[must_use]
    pub fn assignments(&self) -> Vec<(ItemField, FieldValue)> {
        let mut out = Vec::with_capacity(3);
        if let Some(name) = &self.name {
            out.push((ItemField::Name, FieldValue::Text(Some(name.clone()))));
        }
        if let Some(description) = &self.description {
            out.push((ItemField::Description, FieldValue::Text(description.clone())));
        }
        if let Some(status) = self.status {
            out.push((ItemField::Status, FieldValue::Status(status)));
        }
        out
    }

    /// Applies the patch to an in-memory row.
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            item.description.clone_from(description);
        }
        if let Some(status) = self.status {
            item.status = status;
        }
    }
}

/// Trims and bounds an item name.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidRequest`] if the name is blank or longer
/// than [`MAX_ITEM_NAME_LEN`] characters.
pub fn validate_item_name(raw: &str) -> Result<String, ServiceError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidRequest("item name is required".to_string()));
    }
    if name.chars().count() > MAX_ITEM_NAME_LEN {
        return Err(ServiceError::InvalidRequest(format!(
            "item name exceeds {MAX_ITEM_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Trims a description, treating blank text as absent.
#[must_use]
pub fn normalize_description(raw: Option<String>) -> Option<String> {
    raw.map(|d| d.trim().to_string()).filter(|d| !d.is_empty())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn sample_item() -> Item {
        Item {
            id: ItemId::new(),
            owner_id: AccountId::new(),
            name: "Drill".to_string(),
            description: Some("cordless".to_string()),
            status: ItemStatus::Available,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn status_round_trips_through_column_value() {
        for status in [ItemStatus::Available, ItemStatus::Borrowed, ItemStatus::Pending] {
            assert_eq!(status.as_str().parse::<ItemStatus>().ok(), Some(status));
        }
        assert!("lost".parse::<ItemStatus>().is_err());
    }

    #[test]
    fn empty_patch_is_rejected() {
        assert!(matches!(
            ItemPatch::default().validated(),
            Err(ServiceError::InvalidRequest(_))
        ));
    }

    #[test]
    fn blank_name_is_rejected() {
        let patch = ItemPatch {
            name: Some("   ".to_string()),
            ..ItemPatch::default()
        };
        assert!(patch.validated().is_err());
    }

    #[test]
    fn assignments_follow_column_order() {
        let patch = ItemPatch {
            name: Some("Ladder".to_string()),
            description: Some(None),
            status: Some(ItemStatus::Borrowed),
        };
        let columns: Vec<&str> = patch
            .assignments()
            .iter()
            .map(|(field, _)| field.column())
            .collect();
        assert_eq!(columns, ["name", "description", "status"]);
    }

    #[test]
    fn apply_touches_only_present_fields() {
        let mut item = sample_item();
        let patch = ItemPatch {
            status: Some(ItemStatus::Borrowed),
            ..ItemPatch::default()
        };
        patch.apply_to(&mut item);
        assert_eq!(item.status, ItemStatus::Borrowed);
        assert_eq!(item.name, "Drill");
        assert_eq!(item.description.as_deref(), Some("cordless"));
    }

    #[test]
    fn clearing_description_through_patch() {
        let mut item = sample_item();
        let Ok(patch) = (ItemPatch {
            description: Some(Some("  ".to_string())),
            ..ItemPatch::default()
        })
        .validated() else {
            panic!("valid patch rejected");
        };
        patch.apply_to(&mut item);
        assert_eq!(item.description, None);
    }
}
