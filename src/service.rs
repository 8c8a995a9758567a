// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The operation service: merge-on-save plus the read accessors exposed
//! to the transport layer.
//!
//! # Save flow
//!
//! ```text
//! lock (client_id, booking)
//!   └► find existing ──► validate request items ──► build / merge
//!        └► write operation ──► register vacant items ──► unlock
//! ```
//!
//! A validation failure aborts before any write. A failed operation write
//! aborts before any item is registered.
//!
//! # Example
//!
//! ```
//! use operation_store::{MergeRequest, OperationService, StoreConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = OperationService::in_memory(&StoreConfig::default());
//!
//! let saved = service.save("CLI-1", &MergeRequest::new("B1").container("C1")).await?;
//! assert_eq!(saved.containers.len(), 1);
//!
//! // Reusing the same container id is rejected
//! let again = service.save("CLI-1", &MergeRequest::new("B2").container("C1")).await;
//! assert!(again.is_err());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::OperationCache;
use crate::config::StoreConfig;
use crate::error::{OperationError, ValidationError};
use crate::item::Item;
use crate::merge;
use crate::operation::{Container, MergeRequest, Operation, Order};
use crate::repository::{Availability, ItemRegistry, OperationRepository};
use crate::resilience::ResiliencePolicy;
use crate::storage::memory::InMemoryStore;
use crate::storage::redis::RedisStore;
use crate::storage::traits::{ItemStore, OperationStore, StorageError};

pub struct OperationService {
    operations: OperationRepository,
    items: ItemRegistry,
    /// One lock per `(client_id, booking)` with a save in flight
    key_locks: DashMap<(String, String), Arc<Mutex<()>>>,
}

impl OperationService {
    pub fn new(operations: OperationRepository, items: ItemRegistry) -> Self {
        Self {
            operations,
            items,
            key_locks: DashMap::new(),
        }
    }

    /// Wire a service against the backend named by the config: Redis when
    /// `redis_url` is set, an in-process store otherwise.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StorageError> {
        match &config.redis_url {
            Some(url) => {
                let store = Arc::new(RedisStore::with_prefix(url, Some(&config.key_prefix)).await?);
                info!(prefix = %config.key_prefix, "Operation store backed by Redis");
                Ok(Self::with_store(store.clone(), store, config))
            }
            None => {
                warn!("No redis_url configured, operations are held in memory only");
                Ok(Self::in_memory(config))
            }
        }
    }

    /// Service over a fresh [`InMemoryStore`].
    pub fn in_memory(config: &StoreConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::with_store(store.clone(), store, config)
    }

    fn with_store(
        operations: Arc<dyn OperationStore>,
        items: Arc<dyn ItemStore>,
        config: &StoreConfig,
    ) -> Self {
        let repository = OperationRepository::new(
            operations,
            Arc::new(OperationCache::new()),
            ResiliencePolicy::from_config(config),
        );
        Self::new(repository, ItemRegistry::new(items))
    }

    #[must_use]
    pub fn operations(&self) -> &OperationRepository {
        &self.operations
    }

    #[must_use]
    pub fn items(&self) -> &ItemRegistry {
        &self.items
    }

    /// Merge a request into the client's operation for its booking and
    /// persist the result. Returns the operation as written.
    #[tracing::instrument(skip(self, request), fields(booking = %request.booking))]
    pub async fn save(&self, client_id: &str, request: &MergeRequest) -> Result<Operation, OperationError> {
        let key = (client_id.to_string(), request.booking.clone());
        let lock = self.key_locks.entry(key.clone()).or_default().clone();

        let result = {
            let _guard = lock.lock().await;
            self.save_locked(client_id, request).await
        };

        drop(lock);
        self.key_locks.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    async fn save_locked(&self, client_id: &str, request: &MergeRequest) -> Result<Operation, OperationError> {
        let existing = self
            .operations
            .find_by_client_id_and_booking(client_id, &request.booking)
            .await?;

        let to_register = self.validate_request_items(request).await?;

        let (operation, kind) = match existing {
            None => (merge::build_operation(client_id, request), "created"),
            Some(existing) => (merge::merge_operation(existing, request), "updated"),
        };

        self.operations.save(&operation).await?;

        for item in &to_register {
            self.items.register(item).await?;
        }

        crate::metrics::record_save(kind);
        info!(
            kind,
            containers = operation.containers.len(),
            orders = operation.orders.len(),
            registered = to_register.len(),
            "Operation saved"
        );
        Ok(operation)
    }

    /// Check every id the request introduces against the registry.
    ///
    /// Returns the candidates that are free to register. Ids already
    /// registered under a different type pass validation but are not
    /// returned, since the registry holds one record per id. The same holds
    /// within one request: an id used in several roles is registered under
    /// its first role only.
    #[tracing::instrument(skip(self, request), fields(booking = %request.booking))]
    pub async fn validate_request_items(&self, request: &MergeRequest) -> Result<Vec<Item>, OperationError> {
        let candidates = merge::unique_candidates(request).map_err(rejected)?;

        let mut vacant: Vec<Item> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            // Candidates are unique per (id, type), so a match here is another role
            if let Some(first) = vacant.iter().find(|item| item.id == candidate.id) {
                debug!(item = %candidate, existing = %first.item_type, "Id reused across types in request");
                continue;
            }
            match self.items.check(&candidate).await? {
                Availability::Vacant => vacant.push(candidate),
                Availability::ReusedAcrossTypes { existing } => {
                    debug!(item = %candidate, %existing, "Id reused across types");
                }
                Availability::Taken => {
                    return Err(rejected(ValidationError::AlreadyExists {
                        id: candidate.id,
                        item_type: candidate.item_type,
                    }));
                }
            }
        }
        Ok(vacant)
    }

    /// Every operation of the client.
    pub async fn operations_by_client(&self, client_id: &str) -> Result<Vec<Operation>, OperationError> {
        Ok(self.operations.find_all_by_client_id(client_id).await?)
    }

    pub async fn operation(&self, client_id: &str, booking: &str) -> Result<Option<Operation>, OperationError> {
        Ok(self.operations.find_by_client_id_and_booking(client_id, booking).await?)
    }

    /// Containers across every operation of the client.
    pub async fn containers_by_client(&self, client_id: &str) -> Result<Vec<Container>, OperationError> {
        Ok(self
            .operations_by_client(client_id)
            .await?
            .into_iter()
            .flat_map(|op| op.containers)
            .collect())
    }

    /// Orders across every operation of the client.
    pub async fn orders_by_client(&self, client_id: &str) -> Result<Vec<Order>, OperationError> {
        Ok(self
            .operations_by_client(client_id)
            .await?
            .into_iter()
            .flat_map(|op| op.orders)
            .collect())
    }

    pub async fn orders_by_container_id(&self, client_id: &str, container_id: &str) -> Result<Vec<Order>, OperationError> {
        Ok(self.operations.orders_by_container_id(client_id, container_id).await?)
    }

    pub async fn containers_by_purchase_id(
        &self,
        client_id: &str,
        purchase_id: &str,
    ) -> Result<Vec<Container>, OperationError> {
        Ok(self.operations.containers_by_purchase_id(client_id, purchase_id).await?)
    }

    /// Number of keys with a save in flight
    #[must_use]
    pub fn pending_saves(&self) -> usize {
        self.key_locks.len()
    }
}

fn rejected(error: ValidationError) -> OperationError {
    warn!(error = %error, "Merge request rejected");
    crate::metrics::record_validation_failure(error.kind());
    error.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemType;

    fn service() -> OperationService {
        OperationService::in_memory(&StoreConfig::default())
    }

    #[tokio::test]
    async fn test_save_creates_operation_and_items() {
        let service = service();
        let saved = service
            .save("CLI-1", &MergeRequest::new("B1").container("C1"))
            .await
            .unwrap();

        assert_eq!(saved.client_id, "CLI-1");
        assert_eq!(saved.booking, "B1");
        assert_eq!(saved.containers, vec![Container::new("C1")]);
        assert!(saved.orders.is_empty());

        let item = service.items().get_by_id("C1").await.unwrap().unwrap();
        assert_eq!(item.item_type, ItemType::Container);
        assert_eq!(service.pending_saves(), 0);
    }

    #[tokio::test]
    async fn test_second_save_merges() {
        let service = service();
        service.save("CLI-1", &MergeRequest::new("B1").container("C1")).await.unwrap();
        let merged = service
            .save("CLI-1", &MergeRequest::new("B1").container("C2").order(Order::new("P1")))
            .await
            .unwrap();

        assert_eq!(merged.containers, vec![Container::new("C1"), Container::new("C2")]);
        assert_eq!(merged.orders, vec![Order::new("P1")]);
        assert_eq!(service.operation("CLI-1", "B1").await.unwrap(), Some(merged));
    }

    #[tokio::test]
    async fn test_duplicate_in_request_writes_nothing() {
        let service = service();
        let err = service
            .save("CLI-1", &MergeRequest::new("B1").container("C1").container("C1"))
            .await
            .unwrap_err();

        assert!(matches!(err, OperationError::Validation(ValidationError::DuplicateItems)));
        assert!(service.operation("CLI-1", "B1").await.unwrap().is_none());
        assert!(service.items().get_by_id("C1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_same_type_reuse_rejected() {
        let service = service();
        service.save("CLI-1", &MergeRequest::new("B1").container("X1")).await.unwrap();

        let err = service
            .save("CLI-1", &MergeRequest::new("B2").container("X1"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Some items already exist with the same type");
        assert!(service.operation("CLI-1", "B2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cross_type_reuse_accepted() {
        let service = service();
        service.save("CLI-1", &MergeRequest::new("B1").container("X1")).await.unwrap();

        let saved = service
            .save("CLI-1", &MergeRequest::new("B2").order(Order::new("X1")))
            .await
            .unwrap();
        assert_eq!(saved.orders, vec![Order::new("X1")]);

        // Registry still holds the original role
        let item = service.items().get_by_id("X1").await.unwrap().unwrap();
        assert_eq!(item.item_type, ItemType::Container);
    }

    #[tokio::test]
    async fn test_validate_returns_only_vacant_items() {
        let service = service();
        service.save("CLI-1", &MergeRequest::new("B1").container("X1")).await.unwrap();

        let request = MergeRequest::new("B2").order(Order::new("X1").with_invoices(["I1"]));
        let vacant = service.validate_request_items(&request).await.unwrap();
        assert_eq!(vacant, vec![Item::invoice("I1")]);
    }

    #[tokio::test]
    async fn test_same_id_in_two_roles_registers_first_role() {
        let service = service();
        let request = MergeRequest::new("B1").container("X1").order(Order::new("X1"));

        let vacant = service.validate_request_items(&request).await.unwrap();
        assert_eq!(vacant, vec![Item::container("X1")]);

        let saved = service.save("CLI-1", &request).await.unwrap();
        assert_eq!(saved.containers, vec![Container::new("X1")]);
        assert_eq!(saved.orders, vec![Order::new("X1")]);

        let item = service.items().get_by_id("X1").await.unwrap().unwrap();
        assert_eq!(item.item_type, ItemType::Container);
        assert_eq!(service.operation("CLI-1", "B1").await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn test_same_id_in_two_roles_rejected_when_second_role_taken() {
        let service = service();
        service.save("CLI-1", &MergeRequest::new("B1").order(Order::new("X1"))).await.unwrap();

        // Container role is vacant, purchase role is already registered
        let err = service
            .save("CLI-1", &MergeRequest::new("B2").container("X1").order(Order::new("X1")))
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::Validation(ValidationError::AlreadyExists { .. })));
        assert!(service.operation("CLI-1", "B2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_flattened_reads() {
        let service = service();
        service
            .save("CLI-1", &MergeRequest::new("B1").container("C1").order(Order::new("P1")))
            .await
            .unwrap();
        service
            .save("CLI-1", &MergeRequest::new("B2").container("C2").order(Order::new("P2")))
            .await
            .unwrap();

        assert_eq!(service.operations_by_client("CLI-1").await.unwrap().len(), 2);
        assert_eq!(
            service.containers_by_client("CLI-1").await.unwrap(),
            vec![Container::new("C1"), Container::new("C2")]
        );
        assert_eq!(service.orders_by_client("CLI-1").await.unwrap().len(), 2);
        assert_eq!(
            service.orders_by_container_id("CLI-1", "C2").await.unwrap(),
            vec![Order::new("P2")]
        );
        assert_eq!(
            service.containers_by_purchase_id("CLI-1", "P1").await.unwrap(),
            vec![Container::new("C1")]
        );
        assert!(service.operations_by_client("CLI-9").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_saves_same_booking_lose_nothing() {
        let service = Arc::new(service());
        let mut handles = vec![];

        for i in 0..16 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .save("CLI-1", &MergeRequest::new("B1").container(format!("C{}", i)))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let op = service.operation("CLI-1", "B1").await.unwrap().unwrap();
        assert_eq!(op.containers.len(), 16);
        assert_eq!(service.pending_saves(), 0);
    }
}
