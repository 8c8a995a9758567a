// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Resilience primitives for remote store calls: bulkhead, retry with
//! backoff, circuit breaker, and the [`ResiliencePolicy`] that stacks them.

pub mod bulkhead;
pub mod circuit_breaker;
pub mod policy;
pub mod retry;

pub use bulkhead::{Bulkhead, BulkheadConfig, BulkheadFull};
pub use circuit_breaker::{CircuitBreaker, CircuitConfig, CircuitError, CircuitState};
pub use policy::{ResilienceError, ResiliencePolicy, DEFAULT_POLICY_NAME};
pub use retry::{retry, retry_if, RetryConfig};
