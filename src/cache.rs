// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Local write-through cache of operations.
//!
//! A process-lifetime, unbounded, last-write-wins map keyed by
//! `client_id + ":" + booking`. It is populated only from successful
//! remote reads and consulted only when the remote store is unavailable.
//! No eviction: entries are added or overwritten, never removed.

use dashmap::DashMap;
use tracing::trace;

use crate::operation::{cache_key, Operation};

pub struct OperationCache {
    entries: DashMap<String, Operation>,
}

impl OperationCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Upsert one operation.
    pub fn cache(&self, operation: &Operation) {
        trace!(client_id = %operation.client_id, booking = %operation.booking, "Caching operation");
        self.entries.insert(operation.cache_key(), operation.clone());
        crate::metrics::set_cache_entries(self.entries.len());
    }

    /// Upsert a batch.
    pub fn cache_all<'a>(&self, operations: impl IntoIterator<Item = &'a Operation>) {
        for operation in operations {
            self.entries.insert(operation.cache_key(), operation.clone());
        }
        crate::metrics::set_cache_entries(self.entries.len());
    }

    /// Linear scan over every entry.
    #[must_use]
    pub fn find_all_by_client_id(&self, client_id: &str) -> Vec<Operation> {
        let mut found: Vec<Operation> = self
            .entries
            .iter()
            .filter(|entry| entry.value().client_id == client_id)
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| a.booking.cmp(&b.booking));
        found
    }

    #[must_use]
    pub fn find_by_client_id_and_booking(&self, client_id: &str, booking: &str) -> Option<Operation> {
        self.entries
            .get(&cache_key(client_id, booking))
            .map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for OperationCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Container;
    use std::sync::Arc;

    fn op(client_id: &str, booking: &str, container: &str) -> Operation {
        let mut op = Operation::new(client_id, booking);
        op.containers.push(Container::new(container));
        op
    }

    #[test]
    fn test_new_cache_is_empty() {
        let cache = OperationCache::new();
        assert!(cache.is_empty());
        assert!(cache.find_by_client_id_and_booking("CLI-1", "BKG-1").is_none());
        assert!(cache.find_all_by_client_id("CLI-1").is_empty());
    }

    #[test]
    fn test_cache_and_lookup() {
        let cache = OperationCache::new();
        let entry = op("CLI-1", "BKG-1", "C1");
        cache.cache(&entry);

        assert_eq!(cache.find_by_client_id_and_booking("CLI-1", "BKG-1"), Some(entry));
        assert!(cache.find_by_client_id_and_booking("CLI-2", "BKG-1").is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let cache = OperationCache::new();
        cache.cache(&op("CLI-1", "BKG-1", "C1"));
        cache.cache(&op("CLI-1", "BKG-1", "C2"));

        assert_eq!(cache.len(), 1);
        let found = cache.find_by_client_id_and_booking("CLI-1", "BKG-1").unwrap();
        assert_eq!(found.containers, vec![Container::new("C2")]);
    }

    #[test]
    fn test_cache_all_and_filter_by_client() {
        let cache = OperationCache::new();
        let batch = vec![
            op("CLI-1", "BKG-2", "C2"),
            op("CLI-1", "BKG-1", "C1"),
            op("CLI-2", "BKG-1", "C3"),
        ];
        cache.cache_all(&batch);

        let bookings: Vec<String> = cache
            .find_all_by_client_id("CLI-1")
            .into_iter()
            .map(|o| o.booking)
            .collect();
        assert_eq!(bookings, vec!["BKG-1", "BKG-2"]);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let cache = Arc::new(OperationCache::new());
        let mut handles = vec![];

        for t in 0..8 {
            let cache = cache.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..50 {
                    let entry = op("CLI-1", &format!("BKG-{}-{}", t, i), "C");
                    cache.cache(&entry);
                    assert!(cache.find_by_client_id_and_booking("CLI-1", &entry.booking).is_some());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 400);
    }
}
