use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use crate::item::Item;
use super::record::OperationRecord;
use super::traits::{ItemStore, OperationStore, StorageError};

/// DashMap-backed stand-in for the remote store.
///
/// Holds the same flat [`OperationRecord`] encoding as [`super::redis::RedisStore`],
/// so data read back has the same shape as in production.
pub struct InMemoryStore {
    /// Keyed by `(client_id, booking)`
    operations: DashMap<(String, String), OperationRecord>,
    items: DashMap<String, Item>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            operations: DashMap::new(),
            items: DashMap::new(),
        }
    }

    /// Number of stored operation records
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Number of registered items
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.items.is_empty()
    }

    /// Clear all records
    pub fn clear(&self) {
        self.operations.clear();
        self.items.clear();
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OperationStore for InMemoryStore {
    async fn put_operation(&self, record: &OperationRecord) -> Result<(), StorageError> {
        self.operations
            .insert((record.client_id.clone(), record.booking.clone()), record.clone());
        Ok(())
    }

    async fn get_operation(&self, client_id: &str, booking: &str) -> Result<Option<OperationRecord>, StorageError> {
        let key = (client_id.to_string(), booking.to_string());
        Ok(self.operations.get(&key).map(|r| r.value().clone()))
    }

    async fn query_operations(&self, client_id: &str) -> Result<Vec<OperationRecord>, StorageError> {
        let mut records: Vec<OperationRecord> = self
            .operations
            .iter()
            .filter(|r| r.value().client_id == client_id)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| a.booking.cmp(&b.booking));
        Ok(records)
    }
}

#[async_trait]
impl ItemStore for InMemoryStore {
    async fn get_item(&self, id: &str) -> Result<Option<Item>, StorageError> {
        Ok(self.items.get(id).map(|r| r.value().clone()))
    }

    async fn insert_item(&self, item: &Item) -> Result<bool, StorageError> {
        match self.items.entry(item.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(item.clone());
                Ok(true)
            }
        }
    }
}
