// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Operation records and merge requests.
//!
//! An [`Operation`] is the accumulated state of one booking for one client:
//! the containers moved under it and the purchase orders (with their
//! invoices) attached to it. It is the unit of storage and of caching,
//! identified by `(client_id, booking)`.
//!
//! # Example
//!
//! ```
//! use operation_store::{Operation, Container};
//!
//! let mut op = Operation::new("CLI-1", "BKG-1");
//! op.containers.push(Container::new("CONT-1"));
//!
//! assert_eq!(op.cache_key(), "CLI-1:BKG-1");
//! assert!(op.orders.is_empty());
//! ```

use serde::{Deserialize, Serialize};

/// One booking's accumulated containers and orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Tenant/owner scope
    pub client_id: String,
    /// Business key, unique per client
    pub booking: String,
    /// Unique by `container` value
    #[serde(default)]
    pub containers: Vec<Container>,
    /// Unique by `purchase` value
    #[serde(default)]
    pub orders: Vec<Order>,
}

impl Operation {
    /// Create an empty operation for a booking.
    pub fn new(client_id: impl Into<String>, booking: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            booking: booking.into(),
            containers: Vec::new(),
            orders: Vec::new(),
        }
    }

    /// Key under which this operation is cached.
    #[must_use]
    pub fn cache_key(&self) -> String {
        cache_key(&self.client_id, &self.booking)
    }

    /// True if any container on this operation has the given id.
    #[must_use]
    pub fn has_container(&self, container_id: &str) -> bool {
        self.containers.iter().any(|c| c.container == container_id)
    }

    /// True if any order on this operation has the given purchase id.
    #[must_use]
    pub fn has_purchase(&self, purchase_id: &str) -> bool {
        self.orders.iter().any(|o| o.purchase == purchase_id)
    }
}

/// Composite cache key: `client_id + ":" + booking`.
#[inline]
#[must_use]
pub fn cache_key(client_id: &str, booking: &str) -> String {
    format!("{}:{}", client_id, booking)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Container {
    pub container: String,
}

impl Container {
    pub fn new(container: impl Into<String>) -> Self {
        Self { container: container.into() }
    }
}

/// A purchase order. Invoices are nested and never deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub purchase: String,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
}

impl Order {
    pub fn new(purchase: impl Into<String>) -> Self {
        Self {
            purchase: purchase.into(),
            invoices: Vec::new(),
        }
    }

    /// Builder-style helper to attach invoices.
    #[must_use]
    pub fn with_invoices<I, S>(mut self, invoices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.invoices.extend(invoices.into_iter().map(Invoice::new));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice: String,
}

impl Invoice {
    pub fn new(invoice: impl Into<String>) -> Self {
        Self { invoice: invoice.into() }
    }
}

/// Incoming merge payload, as handed over by the (already authenticated)
/// transport layer.
///
/// Shape: `{booking, containers?: [{container}], orders?: [{purchase, invoices?: [{invoice}]}]}`.
/// Missing lists deserialize as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub booking: String,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

impl MergeRequest {
    pub fn new(booking: impl Into<String>) -> Self {
        Self {
            booking: booking.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn container(mut self, container: impl Into<String>) -> Self {
        self.containers.push(Container::new(container));
        self
    }

    #[must_use]
    pub fn order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }
}
