// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the operation store.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding service is responsible for choosing the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `operation_store_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `tier`: remote, cache
//! - `operation`: put_operation, get_operation, query_operations, ...
//! - `outcome`: success, capacity, circuit_open, exhausted

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record the outcome of a protected call to the remote store
pub fn record_remote_call(operation: &str, outcome: &str) {
    counter!(
        "operation_store_remote_calls_total",
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record operation latency
pub fn record_latency(tier: &str, operation: &str, duration: Duration) {
    histogram!(
        "operation_store_operation_seconds",
        "tier" => tier.to_string(),
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record circuit breaker state change (0 = closed, 1 = half-open, 2 = open)
pub fn set_circuit_state(circuit: &str, state: u8) {
    gauge!(
        "operation_store_circuit_breaker_state",
        "circuit" => circuit.to_string()
    )
    .set(state as f64);
}

/// Record circuit breaker call
pub fn record_circuit_call(circuit: &str, outcome: &str) {
    counter!(
        "operation_store_circuit_breaker_calls_total",
        "circuit" => circuit.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a call turned away by a full bulkhead
pub fn record_bulkhead_rejection(bulkhead: &str) {
    counter!(
        "operation_store_bulkhead_rejections_total",
        "bulkhead" => bulkhead.to_string()
    )
    .increment(1);
}

/// Record a read served from the local cache because the remote store failed
pub fn record_cache_fallback(operation: &str) {
    counter!(
        "operation_store_cache_fallbacks_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Set current local cache entry count
pub fn set_cache_entries(count: usize) {
    gauge!("operation_store_cache_entries").set(count as f64);
}

/// Record a merge request rejected by item validation
pub fn record_validation_failure(kind: &str) {
    counter!(
        "operation_store_validation_failures_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record a completed save, `created` or `updated`
pub fn record_save(kind: &str) {
    counter!(
        "operation_store_saves_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Timer guard that records latency on drop
pub struct LatencyTimer {
    tier: &'static str,
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(tier: &'static str, operation: &'static str) -> Self {
        Self {
            tier,
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.tier, self.operation, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // No recorder is installed, so these only verify the calls don't panic.

    #[test]
    fn test_record_remote_call() {
        record_remote_call("get_operation", "success");
        record_remote_call("put_operation", "exhausted");
        record_remote_call("query_operations", "circuit_open");
    }

    #[test]
    fn test_record_latency() {
        record_latency("remote", "get_operation", Duration::from_millis(3));
        record_latency("cache", "get_operation", Duration::from_micros(20));
    }

    #[test]
    fn test_resilience_metrics() {
        set_circuit_state("operationsRepository", 0);
        set_circuit_state("operationsRepository", 2);
        record_circuit_call("operationsRepository", "rejected");
        record_bulkhead_rejection("operationsRepository");
    }

    #[test]
    fn test_store_metrics() {
        record_cache_fallback("find_all_by_client_id");
        set_cache_entries(42);
        record_validation_failure("duplicate_items");
        record_save("created");
    }

    #[test]
    fn test_latency_timer_records_on_drop() {
        {
            let _timer = LatencyTimer::new("remote", "get_operation");
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}
