// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! One wrapper for every protected call to the remote store.
//!
//! Layers, outermost first:
//!
//! ```text
//! bulkhead ── full? ──────────────► Capacity (no attempt, no retry)
//!    │
//! retry loop ── attempts exhausted ► Exhausted(last error)
//!    │
//! circuit breaker ── open? ───────► CircuitOpen (retry stops)
//!    │
//! remote store call
//! ```
//!
//! The bulkhead slot is held across all retry attempts of one call.

use std::future::Future;
use thiserror::Error;
use tracing::debug;

use crate::config::StoreConfig;
use crate::metrics::LatencyTimer;
use crate::storage::traits::StorageError;
use super::bulkhead::{Bulkhead, BulkheadConfig, BulkheadFull};
use super::circuit_breaker::{CircuitBreaker, CircuitConfig, CircuitError};
use super::retry::{retry_if, RetryConfig};

/// Policy name used when none is configured
pub const DEFAULT_POLICY_NAME: &str = "operationsRepository";

#[derive(Debug, Error)]
pub enum ResilienceError {
    /// Bulkhead full; the remote store was not attempted
    #[error(transparent)]
    Capacity(#[from] BulkheadFull),

    /// Breaker open; the remote store was not attempted
    #[error("circuit breaker '{name}' is open, call rejected")]
    CircuitOpen { name: String },

    /// Every permitted attempt failed
    #[error("remote call failed after retries: {0}")]
    Exhausted(#[source] StorageError),
}

impl ResilienceError {
    /// Capacity errors are surfaced to callers; everything else is an
    /// outage that reads may absorb with a cache fallback.
    #[must_use]
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::Capacity(_))
    }

    fn outcome(&self) -> &'static str {
        match self {
            Self::Capacity(_) => "capacity",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::Exhausted(_) => "exhausted",
        }
    }
}

pub struct ResiliencePolicy {
    name: String,
    bulkhead: Bulkhead,
    retry: RetryConfig,
    circuit: CircuitBreaker,
}

impl ResiliencePolicy {
    pub fn new(
        name: impl Into<String>,
        bulkhead: BulkheadConfig,
        retry: RetryConfig,
        circuit: CircuitConfig,
    ) -> Self {
        let name = name.into();
        Self {
            bulkhead: Bulkhead::new(name.clone(), bulkhead),
            circuit: CircuitBreaker::new(name.clone(), circuit),
            retry,
            name,
        }
    }

    /// Build the policy described by a store config.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(
            config.policy_name.clone(),
            config.bulkhead_config(),
            config.retry_config(),
            config.circuit_config(),
        )
    }

    /// Tight limits and millisecond delays, for tests.
    pub fn for_tests(name: impl Into<String>) -> Self {
        Self::new(name, BulkheadConfig::default(), RetryConfig::test(), CircuitConfig::test())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn circuit(&self) -> &CircuitBreaker {
        &self.circuit
    }

    #[must_use]
    pub fn bulkhead(&self) -> &Bulkhead {
        &self.bulkhead
    }

    /// Run `f` under bulkhead, retry and circuit breaker.
    ///
    /// `f` is invoked once per attempt and must build a fresh future each time.
    pub async fn call<F, Fut, T>(&self, operation: &'static str, mut f: F) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let _slot = self.bulkhead.try_enter()?;
        let _timer = LatencyTimer::new("remote", operation);

        let result = retry_if(
            operation,
            &self.retry,
            || {
                let attempt = f();
                self.circuit.call(move || attempt)
            },
            // Malformed records won't fix themselves
            |err| matches!(err, CircuitError::Inner(StorageError::Backend(_))),
        )
        .await
        .map_err(|err| match err {
            CircuitError::Rejected => ResilienceError::CircuitOpen { name: self.name.clone() },
            CircuitError::Inner(e) => ResilienceError::Exhausted(e),
        });

        match &result {
            Ok(_) => crate::metrics::record_remote_call(operation, "success"),
            Err(e) => {
                debug!(policy = %self.name, operation, error = %e, "Protected call failed");
                crate::metrics::record_remote_call(operation, e.outcome());
            }
        }
        result
    }
}
