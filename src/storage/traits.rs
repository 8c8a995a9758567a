use async_trait::async_trait;
use thiserror::Error;
use crate::item::Item;
use super::record::OperationRecord;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Malformed record at '{key}': {reason}")]
    Decode {
        key: String,
        reason: String,
    },
}

/// Remote store holding one [`OperationRecord`] per `(client_id, booking)`.
///
/// Implementations make exactly one attempt per call. Retry, circuit
/// breaking and bulkheading are layered on top by
/// [`crate::resilience::ResiliencePolicy`].
#[async_trait]
pub trait OperationStore: Send + Sync {
    /// Upsert keyed by `(client_id, booking)`.
    async fn put_operation(&self, record: &OperationRecord) -> Result<(), StorageError>;

    async fn get_operation(&self, client_id: &str, booking: &str) -> Result<Option<OperationRecord>, StorageError>;

    /// Indexed lookup of every record in a client's partition.
    async fn query_operations(&self, client_id: &str) -> Result<Vec<OperationRecord>, StorageError>;

    /// Records in a client's partition that carry the given purchase id.
    /// Default implementation filters `query_operations` client-side.
    async fn query_operations_by_purchase(
        &self,
        client_id: &str,
        purchase_id: &str,
    ) -> Result<Vec<OperationRecord>, StorageError> {
        Ok(self
            .query_operations(client_id)
            .await?
            .into_iter()
            .filter(|record| record.has_purchase(purchase_id))
            .collect())
    }
}

/// Remote store for the global item registry.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn get_item(&self, id: &str) -> Result<Option<Item>, StorageError>;
    /// Write the item unless its id is already registered, as one atomic
    /// step. Returns `false` if an item with the same id was already there.
    async fn insert_item(&self, item: &Item) -> Result<bool, StorageError>;
}
