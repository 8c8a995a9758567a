// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Circuit breaker pattern using recloser crate.
//!
//! Protects the remote store from being hammered while it is unhealthy.
//! Wraps async operations and tracks the failure ratio over a sliding
//! window of calls, "tripping" the breaker once the ratio crosses the
//! configured threshold.
//!
//! States:
//! - Closed: Normal operation, calls pass through, outcomes recorded
//! - Open: Store unhealthy, calls fail fast without attempting it
//! - HalfOpen: Cooldown elapsed, trial calls decide between Closed and Open

use recloser::{Recloser, AsyncRecloser, Error as RecloserError};
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Circuit breaker state for metrics/monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed = 0,
    HalfOpen = 1,
    Open = 2,
}

impl CircuitState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::HalfOpen,
            2 => Self::Open,
            _ => Self::Closed,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::HalfOpen => write!(f, "half_open"),
            Self::Open => write!(f, "open"),
        }
    }
}

/// Error type for circuit-protected operations
#[derive(Debug, thiserror::Error)]
pub enum CircuitError<E> {
    /// The circuit breaker rejected the call (circuit is open)
    #[error("circuit breaker open, request rejected")]
    Rejected,

    /// The underlying operation failed
    #[error("operation failed: {0}")]
    Inner(#[source] E),
}

impl<E> From<RecloserError<E>> for CircuitError<E> {
    fn from(err: RecloserError<E>) -> Self {
        match err {
            RecloserError::Rejected => CircuitError::Rejected,
            RecloserError::Inner(e) => CircuitError::Inner(e),
        }
    }
}

/// Configuration for a circuit breaker
#[derive(Debug, Clone)]
pub struct CircuitConfig {
    /// Failure ratio (0.0 - 1.0) that trips the circuit
    pub failure_rate: f32,
    /// Number of calls recorded while closed before the ratio is evaluated
    pub window: usize,
    /// Number of trial calls let through while half-open
    pub half_open_calls: usize,
    /// How long to stay open before allowing trial calls
    pub open_wait: Duration,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_rate: 0.5,
            window: 10,
            half_open_calls: 1,
            open_wait: Duration::from_secs(30),
        }
    }
}

impl CircuitConfig {
    /// Aggressive config (trips on a short window, recovers cautiously)
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            failure_rate: 0.3,
            window: 5,
            half_open_calls: 3,
            open_wait: Duration::from_secs(60),
        }
    }

    /// Lenient config (tolerates more failures before tripping)
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            failure_rate: 0.8,
            window: 20,
            half_open_calls: 1,
            open_wait: Duration::from_secs(15),
        }
    }

    /// Fast trip and recovery for tests
    #[must_use]
    pub fn test() -> Self {
        Self {
            failure_rate: 0.5,
            window: 2,
            half_open_calls: 1,
            open_wait: Duration::from_millis(50),
        }
    }
}

/// A named circuit breaker with metrics tracking
pub struct CircuitBreaker {
    name: String,
    inner: AsyncRecloser,

    /// Last state observed through call outcomes
    observed: AtomicU8,

    // Metrics
    calls_total: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    rejections: AtomicU64,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given name and config
    pub fn new(name: impl Into<String>, config: CircuitConfig) -> Self {
        let recloser = Recloser::custom()
            .error_rate(config.failure_rate)
            .closed_len(config.window)
            .half_open_len(config.half_open_calls)
            .open_wait(config.open_wait)
            .build();

        Self {
            name: name.into(),
            inner: recloser.into(),
            observed: AtomicU8::new(CircuitState::Closed as u8),
            calls_total: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
        }
    }

    /// Create with default config
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self::new(name, CircuitConfig::default())
    }

    /// Get the circuit breaker name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last state observed through call outcomes.
    ///
    /// recloser keeps its state machine private, so this is inferred:
    /// a rejection means Open, a success means Closed, a failure leaves the
    /// last observation unchanged. A trip only shows up on the next call,
    /// and HalfOpen is never reported.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.observed.load(Ordering::Acquire))
    }

    fn observe(&self, state: CircuitState) {
        let previous = self.observed.swap(state as u8, Ordering::AcqRel);
        if previous != state as u8 {
            debug!(circuit = %self.name, from = %CircuitState::from_u8(previous), to = %state, "Circuit state changed");
            crate::metrics::set_circuit_state(&self.name, state as u8);
        }
    }

    /// Execute an async operation through the circuit breaker
    ///
    /// Takes a closure that returns a Future, allowing lazy evaluation
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.calls_total.fetch_add(1, Ordering::Relaxed);

        match self.inner.call(f()).await {
            Ok(result) => {
                self.successes.fetch_add(1, Ordering::Relaxed);
                self.observe(CircuitState::Closed);
                debug!(circuit = %self.name, "Circuit call succeeded");
                crate::metrics::record_circuit_call(&self.name, "success");
                Ok(result)
            }
            Err(RecloserError::Rejected) => {
                self.rejections.fetch_add(1, Ordering::Relaxed);
                self.observe(CircuitState::Open);
                warn!(circuit = %self.name, "Circuit breaker rejected call (open)");
                crate::metrics::record_circuit_call(&self.name, "rejected");
                Err(CircuitError::Rejected)
            }
            Err(RecloserError::Inner(e)) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                debug!(circuit = %self.name, "Circuit call failed");
                crate::metrics::record_circuit_call(&self.name, "failure");
                Err(CircuitError::Inner(e))
            }
        }
    }

    /// Get total number of calls
    #[must_use]
    pub fn calls_total(&self) -> u64 {
        self.calls_total.load(Ordering::Relaxed)
    }

    /// Get number of successful calls
    #[must_use]
    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    /// Get number of failed calls (operation errors)
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Get number of rejected calls (circuit open)
    #[must_use]
    pub fn rejections(&self) -> u64 {
        self.rejections.load(Ordering::Relaxed)
    }

    /// Get failure rate (0.0 - 1.0) over all calls since the last reset
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        let total = self.calls_total();
        if total == 0 {
            return 0.0;
        }
        self.failures() as f64 / total as f64
    }

    /// Reset all metrics
    pub fn reset_metrics(&self) {
        self.calls_total.store(0, Ordering::Relaxed);
        self.successes.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.rejections.store(0, Ordering::Relaxed);
    }
}
