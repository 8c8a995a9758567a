// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Resilient access to persisted operations.
//!
//! Every remote call goes through one [`ResiliencePolicy`]. Reads write
//! their results through to the [`OperationCache`] and, when the remote
//! store is down (retries exhausted or breaker open), answer from that
//! cache instead of failing. Writes have no fallback and never touch the
//! cache.
//!
//! ```text
//! read ──► policy ──► remote ── ok ──► cache.cache / cache_all ──► result
//!            │
//!            └── exhausted / open ──► cache lookup (possibly stale or empty)
//!            └── capacity ──────────► error
//!
//! save ──► policy ──► remote ── ok ──► ()
//!            └── any failure ───────► error (cache untouched)
//! ```

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::OperationCache;
use crate::operation::{Container, Operation, Order};
use crate::resilience::{ResilienceError, ResiliencePolicy};
use crate::storage::record::OperationRecord;
use crate::storage::traits::OperationStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Bulkhead full; the caller may retry later
    #[error(transparent)]
    Capacity(ResilienceError),

    #[error("Failed to save operation")]
    Persistence {
        client_id: String,
        booking: String,
        #[source]
        source: ResilienceError,
    },
}

pub struct OperationRepository {
    store: Arc<dyn OperationStore>,
    cache: Arc<OperationCache>,
    policy: ResiliencePolicy,
}

impl OperationRepository {
    pub fn new(store: Arc<dyn OperationStore>, cache: Arc<OperationCache>, policy: ResiliencePolicy) -> Self {
        Self { store, cache, policy }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<OperationCache> {
        &self.cache
    }

    #[must_use]
    pub fn policy(&self) -> &ResiliencePolicy {
        &self.policy
    }

    /// Persist an operation, replacing any previous record for its
    /// `(client_id, booking)`.
    #[tracing::instrument(skip(self, operation), fields(client_id = %operation.client_id, booking = %operation.booking))]
    pub async fn save(&self, operation: &Operation) -> Result<(), RepositoryError> {
        let record = OperationRecord::encode(operation);

        match self.policy.call("put_operation", || self.store.put_operation(&record)).await {
            Ok(()) => {
                debug!(record_id = %record.id, "Operation persisted");
                Ok(())
            }
            Err(e) if e.is_capacity() => Err(RepositoryError::Capacity(e)),
            Err(e) => {
                warn!(error = %e, "Operation write failed");
                Err(RepositoryError::Persistence {
                    client_id: operation.client_id.clone(),
                    booking: operation.booking.clone(),
                    source: e,
                })
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_all_by_client_id(&self, client_id: &str) -> Result<Vec<Operation>, RepositoryError> {
        match self.policy.call("query_operations", || self.store.query_operations(client_id)).await {
            Ok(records) => {
                let operations: Vec<Operation> = records.iter().map(OperationRecord::decode).collect();
                self.cache.cache_all(&operations);
                Ok(operations)
            }
            Err(e) => self.fallback("query_operations", e, |cache| cache.find_all_by_client_id(client_id)),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_client_id_and_booking(
        &self,
        client_id: &str,
        booking: &str,
    ) -> Result<Option<Operation>, RepositoryError> {
        match self
            .policy
            .call("get_operation", || self.store.get_operation(client_id, booking))
            .await
        {
            Ok(Some(record)) => {
                let operation = record.decode();
                self.cache.cache(&operation);
                Ok(Some(operation))
            }
            Ok(None) => Ok(None),
            Err(e) => self.fallback("get_operation", e, |cache| {
                cache.find_by_client_id_and_booking(client_id, booking)
            }),
        }
    }

    /// Containers of every operation of the client that carries the purchase.
    #[tracing::instrument(skip(self))]
    pub async fn containers_by_purchase_id(
        &self,
        client_id: &str,
        purchase_id: &str,
    ) -> Result<Vec<Container>, RepositoryError> {
        let operations = match self
            .policy
            .call("query_operations_by_purchase", || {
                self.store.query_operations_by_purchase(client_id, purchase_id)
            })
            .await
        {
            Ok(records) => {
                let operations: Vec<Operation> = records.iter().map(OperationRecord::decode).collect();
                self.cache.cache_all(&operations);
                operations
            }
            Err(e) => self.fallback("query_operations_by_purchase", e, |cache| {
                cache
                    .find_all_by_client_id(client_id)
                    .into_iter()
                    .filter(|op| op.has_purchase(purchase_id))
                    .collect::<Vec<_>>()
            })?,
        };

        Ok(operations.into_iter().flat_map(|op| op.containers).collect())
    }

    /// Orders of every operation of the client that moved the container.
    #[tracing::instrument(skip(self))]
    pub async fn orders_by_container_id(
        &self,
        client_id: &str,
        container_id: &str,
    ) -> Result<Vec<Order>, RepositoryError> {
        Ok(self
            .find_all_by_client_id(client_id)
            .await?
            .into_iter()
            .filter(|op| op.has_container(container_id))
            .flat_map(|op| op.orders)
            .collect())
    }

    fn fallback<T>(
        &self,
        operation: &'static str,
        error: ResilienceError,
        from_cache: impl FnOnce(&OperationCache) -> T,
    ) -> Result<T, RepositoryError> {
        if error.is_capacity() {
            return Err(RepositoryError::Capacity(error));
        }
        warn!(operation, error = %error, "Remote store unavailable, serving from local cache");
        crate::metrics::record_cache_fallback(operation);
        Ok(from_cache(&self.cache))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStore;
    use crate::storage::traits::StorageError;
    use async_trait::async_trait;

    fn repo_with(store: Arc<dyn OperationStore>) -> OperationRepository {
        OperationRepository::new(store, Arc::new(OperationCache::new()), ResiliencePolicy::for_tests("test"))
    }

    fn operation(client_id: &str, booking: &str, containers: &[&str], purchases: &[&str]) -> Operation {
        let mut op = Operation::new(client_id, booking);
        op.containers = containers.iter().map(|c| Container::new(*c)).collect();
        op.orders = purchases.iter().map(|p| Order::new(*p)).collect();
        op
    }

    /// Store that fails every call.
    struct DownStore;

    #[async_trait]
    impl OperationStore for DownStore {
        async fn put_operation(&self, _record: &OperationRecord) -> Result<(), StorageError> {
            Err(StorageError::Backend("connection refused".into()))
        }
        async fn get_operation(&self, _c: &str, _b: &str) -> Result<Option<OperationRecord>, StorageError> {
            Err(StorageError::Backend("connection refused".into()))
        }
        async fn query_operations(&self, _c: &str) -> Result<Vec<OperationRecord>, StorageError> {
            Err(StorageError::Backend("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_save_then_find() {
        let repo = repo_with(Arc::new(InMemoryStore::new()));
        let op = operation("CLI-1", "BKG-1", &["C1"], &["P1"]);

        repo.save(&op).await.unwrap();
        let found = repo.find_by_client_id_and_booking("CLI-1", "BKG-1").await.unwrap();
        assert_eq!(found, Some(op));
    }

    #[tokio::test]
    async fn test_save_does_not_touch_cache() {
        let repo = repo_with(Arc::new(InMemoryStore::new()));
        repo.save(&operation("CLI-1", "BKG-1", &["C1"], &[])).await.unwrap();
        assert!(repo.cache().is_empty());
    }

    #[tokio::test]
    async fn test_successful_reads_write_through() {
        let repo = repo_with(Arc::new(InMemoryStore::new()));
        repo.save(&operation("CLI-1", "BKG-1", &["C1"], &[])).await.unwrap();
        repo.save(&operation("CLI-1", "BKG-2", &["C2"], &[])).await.unwrap();

        let all = repo.find_all_by_client_id("CLI-1").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(repo.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_operation_is_none() {
        let repo = repo_with(Arc::new(InMemoryStore::new()));
        assert!(repo.find_by_client_id_and_booking("CLI-1", "nope").await.unwrap().is_none());
        assert!(repo.find_all_by_client_id("CLI-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reads_fall_back_to_cache() {
        let repo = repo_with(Arc::new(DownStore));
        let cached = operation("CLI-1", "BKG-1", &["C1"], &["P1"]);
        repo.cache().cache(&cached);

        let found = repo.find_by_client_id_and_booking("CLI-1", "BKG-1").await.unwrap();
        assert_eq!(found, Some(cached.clone()));

        let all = repo.find_all_by_client_id("CLI-1").await.unwrap();
        assert_eq!(all, vec![cached]);
    }

    #[tokio::test]
    async fn test_fallback_with_empty_cache_is_empty() {
        let repo = repo_with(Arc::new(DownStore));
        assert!(repo.find_by_client_id_and_booking("CLI-1", "BKG-1").await.unwrap().is_none());
        assert!(repo.find_all_by_client_id("CLI-1").await.unwrap().is_empty());
        assert!(repo.containers_by_purchase_id("CLI-1", "P1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_is_persistence_error() {
        let repo = repo_with(Arc::new(DownStore));
        let err = repo.save(&operation("CLI-1", "BKG-1", &["C1"], &[])).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to save operation");
        assert!(matches!(err, RepositoryError::Persistence { ref booking, .. } if booking == "BKG-1"));
        assert!(repo.cache().is_empty());
    }

    #[tokio::test]
    async fn test_containers_by_purchase_id() {
        let repo = repo_with(Arc::new(InMemoryStore::new()));
        repo.save(&operation("CLI-1", "BKG-1", &["C1", "C2"], &["P1"])).await.unwrap();
        repo.save(&operation("CLI-1", "BKG-2", &["C3"], &["P10"])).await.unwrap();
        repo.save(&operation("CLI-2", "BKG-3", &["C4"], &["P1"])).await.unwrap();

        let containers = repo.containers_by_purchase_id("CLI-1", "P1").await.unwrap();
        assert_eq!(containers, vec![Container::new("C1"), Container::new("C2")]);
    }

    #[tokio::test]
    async fn test_orders_by_container_id() {
        let repo = repo_with(Arc::new(InMemoryStore::new()));
        repo.save(&operation("CLI-1", "BKG-1", &["C1"], &["P1", "P2"])).await.unwrap();
        repo.save(&operation("CLI-1", "BKG-2", &["C2"], &["P3"])).await.unwrap();

        let orders = repo.orders_by_container_id("CLI-1", "C1").await.unwrap();
        assert_eq!(orders, vec![Order::new("P1"), Order::new("P2")]);
        assert!(repo.orders_by_container_id("CLI-1", "C9").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_derived_reads_fall_back_to_cache() {
        let repo = repo_with(Arc::new(DownStore));
        repo.cache().cache(&operation("CLI-1", "BKG-1", &["C1"], &["P1"]));

        let containers = repo.containers_by_purchase_id("CLI-1", "P1").await.unwrap();
        assert_eq!(containers, vec![Container::new("C1")]);

        let orders = repo.orders_by_container_id("CLI-1", "C1").await.unwrap();
        assert_eq!(orders, vec![Order::new("P1")]);
    }
}
