//! # Operation Store
//!
//! A resilient store for booking operations: the containers, purchase
//! orders and invoices reported against one booking, merged idempotently
//! and persisted behind a circuit breaker, retry and bulkhead.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      OperationService                       │
//! │  • save(): lock key → read → validate → merge → write      │
//! │  • read accessors (by client, container, purchase)         │
//! └─────────────────────────────────────────────────────────────┘
//!               │                               │
//!               ▼                               ▼
//! ┌───────────────────────────────┐ ┌───────────────────────────┐
//! │      OperationRepository      │ │       ItemRegistry        │
//! │  • ResiliencePolicy per call  │ │  • one uniqueness check   │
//! │  • read fallback to cache     │ │  • point get / register   │
//! └───────────────────────────────┘ └───────────────────────────┘
//!        │                │                     │
//!        ▼                ▼                     ▼
//! ┌──────────────┐ ┌─────────────────────────────────────────────┐
//! │OperationCache│ │        Remote store (Redis / memory)        │
//! │  • DashMap   │ │  • flat operation records, client index     │
//! │  • no evict  │ │  • item records                             │
//! └──────────────┘ └─────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use operation_store::{MergeRequest, OperationService, Order, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = StoreConfig {
//!         redis_url: Some("redis://localhost:6379".into()),
//!         ..Default::default()
//!     };
//!
//!     let service = OperationService::connect(&config).await.expect("Failed to connect");
//!
//!     let request = MergeRequest::new("BKG-1")
//!         .container("MSCU1234567")
//!         .order(Order::new("PO-991").with_invoices(["INV-17"]));
//!     service.save("CLI-1", &request).await.expect("Failed to save");
//!
//!     // Served from the local cache if Redis goes away
//!     let operations = service.operations_by_client("CLI-1").await.unwrap();
//!     println!("{} operations", operations.len());
//! }
//! ```
//!
//! ## Features
//!
//! - **Idempotent Merge**: containers and orders deduplicated by id, existing entries win
//! - **Identity Rules**: an id can't be claimed twice under the same type
//! - **Bulkhead**: fail-fast cap on concurrent remote calls
//! - **Retry Logic**: exponential backoff for transient failures
//! - **Circuit Breaker**: stop calling a failing store for a cooldown
//! - **Cache Fallback**: reads degrade to the last successfully read state
//! - **Per-key Saves**: concurrent saves to one booking are serialized
//!
//! ## Configuration
//!
//! See [`StoreConfig`] for all configuration options.
//!
//! ## Modules
//!
//! - [`service`]: The [`OperationService`] entry point
//! - [`merge`]: Pure merge/dedup functions
//! - [`repository`]: Resilient operation access and the item registry
//! - [`resilience`]: Bulkhead, retry, circuit breaker
//! - [`storage`]: Remote store backends (Redis, memory)
//! - [`cache`]: Local fallback cache

pub mod config;
pub mod operation;
pub mod item;
pub mod cache;
pub mod storage;
pub mod resilience;
pub mod repository;
pub mod merge;
pub mod error;
pub mod service;
pub mod metrics;

pub use config::StoreConfig;
pub use operation::{Container, Invoice, MergeRequest, Operation, Order};
pub use item::{Item, ItemType};
pub use cache::OperationCache;
pub use storage::traits::{ItemStore, OperationStore, StorageError};
pub use storage::record::OperationRecord;
pub use storage::memory::InMemoryStore;
pub use resilience::{CircuitBreaker, CircuitConfig, CircuitError, CircuitState, ResilienceError, ResiliencePolicy, RetryConfig};
pub use repository::{Availability, ItemRegistry, OperationRepository, RegistryError, RepositoryError};
pub use error::{OperationError, ValidationError};
pub use service::OperationService;
pub use metrics::LatencyTimer;
