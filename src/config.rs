//! Configuration for the operation store.
//!
//! # Example
//!
//! ```
//! use operation_store::StoreConfig;
//!
//! // Minimal config (uses defaults)
//! let config = StoreConfig::default();
//! assert_eq!(config.bulkhead_max_concurrent, 25);
//! assert_eq!(config.retry_config().max_retries, Some(3));
//!
//! // Override what you need
//! let config = StoreConfig {
//!     redis_url: Some("redis://localhost:6379".into()),
//!     circuit_open_wait_ms: 5_000,
//!     ..Default::default()
//! };
//! assert_eq!(config.circuit_config().open_wait.as_secs(), 5);
//! ```

use std::time::Duration;
use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::resilience::{BulkheadConfig, CircuitConfig, RetryConfig, DEFAULT_POLICY_NAME};

/// Configuration for the operation store.
///
/// All fields have defaults. Production deployments should at least set
/// `redis_url`.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Redis connection string (e.g., "redis://localhost:6379")
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Prefix for every Redis key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Name shared by the bulkhead and circuit breaker (shows up in logs/metrics)
    #[serde(default = "default_policy_name")]
    pub policy_name: String,

    /// Bulkhead: maximum concurrent remote calls
    #[serde(default = "default_bulkhead_max_concurrent")]
    pub bulkhead_max_concurrent: usize,

    /// Retry: total attempts per call, and backoff
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: usize,
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    #[serde(default = "default_retry_backoff_factor")]
    pub retry_backoff_factor: f64,

    /// Circuit breaker: failure ratio over a window of calls, then cooldown
    #[serde(default = "default_circuit_failure_rate")]
    pub circuit_failure_rate: f32,
    #[serde(default = "default_circuit_window")]
    pub circuit_window: usize,
    #[serde(default = "default_circuit_half_open_calls")]
    pub circuit_half_open_calls: usize,
    #[serde(default = "default_circuit_open_wait_ms")]
    pub circuit_open_wait_ms: u64,
}

fn default_key_prefix() -> String { "ops:".to_string() }
fn default_policy_name() -> String { DEFAULT_POLICY_NAME.to_string() }
fn default_bulkhead_max_concurrent() -> usize { 25 }
fn default_retry_max_attempts() -> usize { 3 }
fn default_retry_initial_delay_ms() -> u64 { 100 }
fn default_retry_max_delay_ms() -> u64 { 2_000 }
fn default_retry_backoff_factor() -> f64 { 2.0 }
fn default_circuit_failure_rate() -> f32 { 0.5 }
fn default_circuit_window() -> usize { 10 }
fn default_circuit_half_open_calls() -> usize { 1 }
fn default_circuit_open_wait_ms() -> u64 { 30_000 }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: default_key_prefix(),
            policy_name: default_policy_name(),
            bulkhead_max_concurrent: default_bulkhead_max_concurrent(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            retry_backoff_factor: default_retry_backoff_factor(),
            circuit_failure_rate: default_circuit_failure_rate(),
            circuit_window: default_circuit_window(),
            circuit_half_open_calls: default_circuit_half_open_calls(),
            circuit_open_wait_ms: default_circuit_open_wait_ms(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: Some(self.retry_max_attempts.max(1)),
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            factor: backoff_factor(self.retry_backoff_factor),
        }
    }

    #[must_use]
    pub fn circuit_config(&self) -> CircuitConfig {
        CircuitConfig {
            failure_rate: self.circuit_failure_rate,
            window: self.circuit_window,
            half_open_calls: self.circuit_half_open_calls,
            open_wait: Duration::from_millis(self.circuit_open_wait_ms),
        }
    }

    #[must_use]
    pub fn bulkhead_config(&self) -> BulkheadConfig {
        BulkheadConfig {
            max_concurrent: self.bulkhead_max_concurrent.min(Semaphore::MAX_PERMITS),
        }
    }
}

/// Backoff never shrinks the delay. Non-finite factors fall back to the default.
fn backoff_factor(factor: f64) -> f64 {
    if factor.is_finite() {
        factor.max(1.0)
    } else {
        default_retry_backoff_factor()
    }
}
