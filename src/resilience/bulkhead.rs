// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bulkhead: a fail-fast cap on concurrent calls into a dependency.
//!
//! Calls beyond the cap are rejected immediately rather than queued, so a
//! slow remote store cannot pile up waiting tasks in the caller.
//!
//! # Example
//!
//! ```
//! use operation_store::resilience::{Bulkhead, BulkheadConfig};
//!
//! let bulkhead = Bulkhead::new("store", BulkheadConfig { max_concurrent: 1 });
//!
//! let permit = bulkhead.try_enter().expect("first call fits");
//! assert!(bulkhead.try_enter().is_err()); // full, rejected without waiting
//!
//! drop(permit);
//! assert!(bulkhead.try_enter().is_ok());
//! ```

use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct BulkheadConfig {
    /// Maximum number of in-flight calls
    pub max_concurrent: usize,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self { max_concurrent: 25 }
    }
}

/// Returned when every slot is taken.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("bulkhead '{name}' is full ({max_concurrent} concurrent calls)")]
pub struct BulkheadFull {
    pub name: String,
    pub max_concurrent: usize,
}

pub struct Bulkhead {
    name: String,
    max_concurrent: usize,
    slots: Semaphore,
}

impl Bulkhead {
    /// Capacity above [`Semaphore::MAX_PERMITS`] is capped to it.
    pub fn new(name: impl Into<String>, config: BulkheadConfig) -> Self {
        let max_concurrent = config.max_concurrent.min(Semaphore::MAX_PERMITS);
        Self {
            name: name.into(),
            max_concurrent,
            slots: Semaphore::new(max_concurrent),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Slots currently free
    #[must_use]
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Take a slot without waiting. The slot is released when the permit drops.
    pub fn try_enter(&self) -> Result<SemaphorePermit<'_>, BulkheadFull> {
        self.slots.try_acquire().map_err(|_| {
            warn!(bulkhead = %self.name, max = self.max_concurrent, "Bulkhead full, rejecting call");
            crate::metrics::record_bulkhead_rejection(&self.name);
            BulkheadFull {
                name: self.name.clone(),
                max_concurrent: self.max_concurrent,
            }
        })
    }
}
