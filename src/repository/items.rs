// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Item registry: the single authority on whether an id may be claimed.
//!
//! [`ItemRegistry::check`] is the only place the "already exists" rule is
//! evaluated. Request validation calls it for every candidate, and
//! [`ItemRegistry::register`] calls it again right before writing. The
//! write itself is insert-if-absent, so two registrations of one id can
//! never both succeed.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::item::{Item, ItemType};
use crate::storage::traits::{ItemStore, StorageError};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Item '{id}' is already registered")]
    AlreadyExists { id: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Outcome of checking a candidate id against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// Nothing registered under this id
    Vacant,
    /// Registered under a different type; reuse is permitted but the id
    /// cannot be registered a second time
    ReusedAcrossTypes { existing: ItemType },
    /// Registered under the same type
    Taken,
}

pub struct ItemRegistry {
    store: Arc<dyn ItemStore>,
}

impl ItemRegistry {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Item>, RegistryError> {
        Ok(self.store.get_item(id).await?)
    }

    /// Look the candidate's id up and classify it against the candidate's type.
    pub async fn check(&self, candidate: &Item) -> Result<Availability, RegistryError> {
        let availability = match self.get_by_id(&candidate.id).await? {
            None => Availability::Vacant,
            Some(existing) if existing.item_type == candidate.item_type => Availability::Taken,
            Some(existing) => Availability::ReusedAcrossTypes {
                existing: existing.item_type,
            },
        };
        debug!(item = %candidate, ?availability, "Checked item");
        Ok(availability)
    }

    /// Register an id. Fails if the id is already registered under any type.
    #[tracing::instrument(skip(self), fields(item = %item))]
    pub async fn register(&self, item: &Item) -> Result<Item, RegistryError> {
        match self.check(item).await? {
            Availability::Vacant => {
                // The check can race another writer; the insert settles it
                if !self.store.insert_item(item).await? {
                    return Err(RegistryError::AlreadyExists { id: item.id.clone() });
                }
                info!("Item registered");
                Ok(item.clone())
            }
            Availability::ReusedAcrossTypes { .. } | Availability::Taken => Err(RegistryError::AlreadyExists {
                id: item.id.clone(),
            }),
        }
    }
}
