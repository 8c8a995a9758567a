// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Remote store backends.
//!
//! - [`traits`]: the [`OperationStore`] / [`ItemStore`] contracts
//! - [`record`]: flat persisted representation of an operation
//! - [`memory`]: DashMap-backed store for tests and single-process use
//! - [`redis`]: the production backend

pub mod traits;
pub mod record;
pub mod memory;
pub mod redis;

pub use traits::{ItemStore, OperationStore, StorageError};
pub use record::OperationRecord;
pub use memory::InMemoryStore;
pub use self::redis::RedisStore;
