//! Item retirement: atomic removal of an item and everything hanging off it.

use std::sync::Arc;

use crate::domain::{ItemId, RetirementReport};
use crate::error::ServiceError;
use crate::persistence::LendingStore;

/// Executes the cascading deletion of an item.
///
/// The store runs the whole cascade (history, requests, messages, item) as
/// one transaction. Retiring an item that is already gone reports
/// [`ServiceError::ItemNotFound`], which makes retries safe.
#[derive(Debug, Clone)]
pub struct RetirementCoordinator {
    store: Arc<dyn LendingStore>,
}

impl RetirementCoordinator {
    /// Creates a new `RetirementCoordinator`.
    #[must_use]
    pub fn new(store: Arc<dyn LendingStore>) -> Self {
        Self { store }
    }

    /// Retires the item and its dependents.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ItemNotFound`] if the item does not exist,
    /// or [`ServiceError::Persistence`] if the transaction failed. In both
    /// cases nothing was deleted.
    pub async fn retire_item(&self, item_id: ItemId) -> Result<RetirementReport, ServiceError> {
        match self.store.retire_item(item_id).await {
            Ok(report) => {
                tracing::info!(
                    %item_id,
                    history = report.history_deleted,
                    requests = report.requests_deleted,
                    messages = report.messages_deleted,
                    "item retired"
                );
                Ok(report)
            }
            Err(ServiceError::ItemNotFound(id)) => {
                tracing::debug!(%item_id, "retirement of missing item");
                Err(ServiceError::ItemNotFound(id))
            }
            Err(err) => {
                tracing::error!(%item_id, error = %err, "item retirement rolled back");
                Err(err)
            }
        }
    }
}
