// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Persisted representation of an [`Operation`].
//!
//! Each record carries a generated unique id plus `client_id`, `booking`,
//! and the containers/orders flattened to a `", "`-joined string of their
//! primary scalar field:
//!
//! ```text
//! id         = 6f1c...-uuid
//! client_id  = CLI-1
//! booking    = BKG-1
//! containers = "CONT-1, CONT-2"
//! orders     = "ORD-1"
//! ```
//!
//! Nested invoices are **not** part of this encoding. An operation read
//! back from the store has its orders' purchase ids only, with empty
//! invoice lists.

use serde::{Deserialize, Serialize};
use crate::operation::{Container, Operation, Order};

/// Separator between flattened identifiers.
pub const FIELD_DELIMITER: &str = ", ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: String,
    pub client_id: String,
    pub booking: String,
    pub containers: String,
    pub orders: String,
}

impl OperationRecord {
    /// Flatten an operation, stamping a fresh record id.
    #[must_use]
    pub fn encode(operation: &Operation) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            client_id: operation.client_id.clone(),
            booking: operation.booking.clone(),
            containers: join(operation.containers.iter().map(|c| c.container.as_str())),
            orders: join(operation.orders.iter().map(|o| o.purchase.as_str())),
        }
    }

    /// Rebuild the operation. Empty segments are dropped.
    #[must_use]
    pub fn decode(&self) -> Operation {
        Operation {
            client_id: self.client_id.clone(),
            booking: self.booking.clone(),
            containers: split(&self.containers).map(Container::new).collect(),
            orders: split(&self.orders).map(Order::new).collect(),
        }
    }

    /// Exact-token match against the flattened purchase ids.
    #[must_use]
    pub fn has_purchase(&self, purchase_id: &str) -> bool {
        split(&self.orders).any(|p| p == purchase_id)
    }

    /// Exact-token match against the flattened container ids.
    #[must_use]
    pub fn has_container(&self, container_id: &str) -> bool {
        split(&self.containers).any(|c| c == container_id)
    }
}

fn join<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join(FIELD_DELIMITER)
}

fn split(flat: &str) -> impl Iterator<Item = &str> {
    flat.split(FIELD_DELIMITER).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Operation {
        let mut op = Operation::new("CLI-1", "BKG-1");
        op.containers = vec![Container::new("CONT-1"), Container::new("CONT-2")];
        op.orders = vec![Order::new("ORD-1").with_invoices(["INV-1", "INV-2"])];
        op
    }

    #[test]
    fn test_encode_flattens_identifiers() {
        let record = OperationRecord::encode(&sample());
        assert_eq!(record.client_id, "CLI-1");
        assert_eq!(record.booking, "BKG-1");
        assert_eq!(record.containers, "CONT-1, CONT-2");
        assert_eq!(record.orders, "ORD-1");
        assert!(!record.id.is_empty());
    }

    #[test]
    fn test_each_encode_gets_fresh_id() {
        let op = sample();
        assert_ne!(OperationRecord::encode(&op).id, OperationRecord::encode(&op).id);
    }

    #[test]
    fn test_decode_drops_invoices() {
        let decoded = OperationRecord::encode(&sample()).decode();
        assert_eq!(decoded.containers.len(), 2);
        assert_eq!(decoded.orders, vec![Order::new("ORD-1")]);
    }

    #[test]
    fn test_empty_lists_encode_to_empty_strings() {
        let record = OperationRecord::encode(&Operation::new("CLI-1", "BKG-1"));
        assert_eq!(record.containers, "");
        assert_eq!(record.orders, "");

        let decoded = record.decode();
        assert!(decoded.containers.is_empty());
        assert!(decoded.orders.is_empty());
    }

    #[test]
    fn test_membership_is_exact_token() {
        let record = OperationRecord::encode(&sample());
        assert!(record.has_purchase("ORD-1"));
        assert!(!record.has_purchase("ORD"));
        assert!(record.has_container("CONT-2"));
        assert!(!record.has_container("CONT"));
    }
}
