// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Pure merge and dedup logic.
//!
//! Merging folds a request into an existing operation:
//!
//! ```text
//! existing.containers ++ request.containers  ──dedup by `container`──►  merged.containers
//! existing.orders     ++ request.orders      ──dedup by `purchase` ──►  merged.orders
//! ```
//!
//! Dedup keeps the first occurrence, so existing entries keep their
//! position and win over incoming ones. On a purchase collision the
//! existing order's invoices are kept and the incoming invoices dropped.
//!
//! # Example
//!
//! ```
//! use operation_store::{merge, MergeRequest, Operation, Order};
//!
//! let mut existing = Operation::new("CLI-1", "BKG-1");
//! existing.orders.push(Order::new("P1").with_invoices(["A"]));
//!
//! let request = MergeRequest::new("BKG-1").order(Order::new("P1").with_invoices(["B"]));
//! let merged = merge::merge_operation(existing, &request);
//!
//! assert_eq!(merged.orders.len(), 1);
//! assert_eq!(merged.orders[0].invoices[0].invoice, "A");
//! ```

use std::collections::HashSet;
use std::hash::Hash;

use crate::error::ValidationError;
use crate::item::Item;
use crate::operation::{MergeRequest, Operation};

/// Build a fresh operation straight from a request. No dedup.
#[must_use]
pub fn build_operation(client_id: &str, request: &MergeRequest) -> Operation {
    Operation {
        client_id: client_id.to_string(),
        booking: request.booking.clone(),
        containers: request.containers.clone(),
        orders: request.orders.clone(),
    }
}

/// Fold a request into an existing operation. `client_id` and `booking`
/// are left as they were.
#[must_use]
pub fn merge_operation(mut existing: Operation, request: &MergeRequest) -> Operation {
    existing.containers = dedup_by_key(
        existing.containers.into_iter().chain(request.containers.iter().cloned()),
        |c| c.container.clone(),
    );
    existing.orders = dedup_by_key(
        existing.orders.into_iter().chain(request.orders.iter().cloned()),
        |o| o.purchase.clone(),
    );
    existing
}

/// Keep the first element for each key, preserving order.
pub fn dedup_by_key<T, K, F>(values: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    values.into_iter().filter(|v| seen.insert(key(v))).collect()
}

/// Every id introduced by the request, typed by role, in request order:
/// containers, then each purchase followed by its invoices.
#[must_use]
pub fn candidate_items(request: &MergeRequest) -> Vec<Item> {
    let mut items = Vec::new();
    items.extend(request.containers.iter().map(|c| Item::container(c.container.clone())));
    for order in &request.orders {
        items.push(Item::purchase(order.purchase.clone()));
        items.extend(order.invoices.iter().map(|i| Item::invoice(i.invoice.clone())));
    }
    items
}

/// Candidates deduplicated by `(id, type)`. Any repeat is a validation error.
pub fn unique_candidates(request: &MergeRequest) -> Result<Vec<Item>, ValidationError> {
    let raw = candidate_items(request);
    let total = raw.len();
    let unique = dedup_by_key(raw, Item::clone);
    if unique.len() < total {
        return Err(ValidationError::DuplicateItems);
    }
    Ok(unique)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemType;
    use crate::operation::{Container, Order};

    fn existing() -> Operation {
        let mut op = Operation::new("CLI-1", "BKG-1");
        op.containers = vec![Container::new("C1"), Container::new("C2")];
        op.orders = vec![Order::new("P1").with_invoices(["A"])];
        op
    }

    #[test]
    fn test_build_copies_request_through() {
        let request = MergeRequest::new("BKG-1")
            .container("C1")
            .order(Order::new("P1").with_invoices(["I1", "I2"]));

        let op = build_operation("CLI-1", &request);
        assert_eq!(op.client_id, "CLI-1");
        assert_eq!(op.booking, "BKG-1");
        assert_eq!(op.containers, request.containers);
        assert_eq!(op.orders, request.orders);
    }

    #[test]
    fn test_merge_appends_new_after_existing() {
        let request = MergeRequest::new("BKG-1").container("C3").container("C1");
        let merged = merge_operation(existing(), &request);

        let ids: Vec<&str> = merged.containers.iter().map(|c| c.container.as_str()).collect();
        assert_eq!(ids, vec!["C1", "C2", "C3"]);
    }

    #[test]
    fn test_merge_same_container_twice_is_idempotent() {
        let request = MergeRequest::new("BKG-1").container("C1");
        let once = merge_operation(existing(), &request);
        let twice = merge_operation(once.clone(), &request);

        assert_eq!(once, twice);
        assert_eq!(once.containers.iter().filter(|c| c.container == "C1").count(), 1);
    }

    #[test]
    fn test_existing_order_invoices_win() {
        let request = MergeRequest::new("BKG-1").order(Order::new("P1").with_invoices(["B"]));
        let merged = merge_operation(existing(), &request);

        assert_eq!(merged.orders, vec![Order::new("P1").with_invoices(["A"])]);
    }

    #[test]
    fn test_merge_keeps_identity() {
        let request = MergeRequest::new("BKG-1").order(Order::new("P2"));
        let merged = merge_operation(existing(), &request);

        assert_eq!(merged.client_id, "CLI-1");
        assert_eq!(merged.booking, "BKG-1");
        assert_eq!(merged.orders.len(), 2);
    }

    #[test]
    fn test_candidate_items_typed_by_role() {
        let request = MergeRequest::new("BKG-1")
            .container("C1")
            .order(Order::new("P1").with_invoices(["I1"]));

        let items = candidate_items(&request);
        assert_eq!(
            items,
            vec![Item::container("C1"), Item::purchase("P1"), Item::invoice("I1")]
        );
    }

    #[test]
    fn test_duplicate_container_rejected() {
        let request = MergeRequest::new("BKG-1").container("C1").container("C1");
        assert_eq!(unique_candidates(&request), Err(ValidationError::DuplicateItems));
    }

    #[test]
    fn test_same_invoice_under_two_orders_rejected() {
        let request = MergeRequest::new("BKG-1")
            .order(Order::new("P1").with_invoices(["I1"]))
            .order(Order::new("P2").with_invoices(["I1"]));
        assert_eq!(unique_candidates(&request), Err(ValidationError::DuplicateItems));
    }

    #[test]
    fn test_same_id_different_roles_is_unique() {
        let request = MergeRequest::new("BKG-1")
            .container("X1")
            .order(Order::new("X1"));

        let unique = unique_candidates(&request).unwrap();
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].item_type, ItemType::Container);
        assert_eq!(unique[1].item_type, ItemType::Purchase);
    }

    #[test]
    fn test_empty_request_has_no_candidates() {
        assert!(unique_candidates(&MergeRequest::new("BKG-1")).unwrap().is_empty());
    }
}
