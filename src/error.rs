// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Errors surfaced by [`crate::OperationService`].

use thiserror::Error;

use crate::item::ItemType;
use crate::repository::{RegistryError, RepositoryError};

/// A merge request was rejected before anything was written. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The same `(id, type)` pair appears more than once in one request
    #[error("Duplicate items found in the request")]
    DuplicateItems,

    /// An id in the request is already registered under the same type
    #[error("Some items already exist with the same type")]
    AlreadyExists { id: String, item_type: ItemType },
}

impl ValidationError {
    /// Label used for the validation failure counter
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateItems => "duplicate_items",
            Self::AlreadyExists { .. } => "already_exists",
        }
    }
}

#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl OperationError {
    /// True for bulkhead rejections, which the caller may retry later.
    #[must_use]
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::Repository(RepositoryError::Capacity(_)))
    }
}
