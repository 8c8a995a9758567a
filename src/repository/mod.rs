// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Repositories over the remote store.
//!
//! - [`OperationRepository`]: resilient operation reads/writes with cache fallback
//! - [`ItemRegistry`]: point access to the global item registry

pub mod operations;
pub mod items;

pub use operations::{OperationRepository, RepositoryError};
pub use items::{Availability, ItemRegistry, RegistryError};
