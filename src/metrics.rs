// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the clusterops operator.
//!
//! This module provides metrics collection with the namespace prefix
//! `clusterops_firestoned_io_` (prometheus-safe version of "clusterops.firestoned.io").
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Track reconciliation passes and their outcomes
//! - **Step Metrics** - Track every attempt of every pipeline step
//! - **Lock Metrics** - Track contention on the subnet allocation lock
//! - **Allocation Metrics** - Track subnets handed out by the allocator
//! - **Drain Metrics** - Track node drain state transitions
//!
//! # Example
//!
//! ```rust,no_run
//! use clusterops::metrics::record_reconciliation_success;
//!
//! // Record a successful reconciliation
//! record_reconciliation_success("Cluster", std::time::Duration::from_secs(1));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all clusterops metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "clusterops_firestoned_io";

/// Step outcome label: the step converged
pub const OUTCOME_SUCCESS: &str = "success";

/// Step outcome label: the step returned an error
pub const OUTCOME_ERROR: &str = "error";

/// Step outcome label: the step canceled the pass
pub const OUTCOME_CANCELED: &str = "canceled";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (e.g., `Cluster`, `NodeDrain`)
/// - `status`: Outcome (`success`, `error`, `canceled`, `requeue`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by resource type and status",
    );
    let counter = CounterVec::new(opts, &["resource_type", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
///
/// Labels:
/// - `resource_type`: Kind of resource
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of requeue operations
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `reason`: CamelCase error reason that caused the requeue
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_requeues_total"),
        "Total number of requeue operations by resource type and reason",
    );
    let counter = CounterVec::new(opts, &["resource_type", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Step Metrics
// ============================================================================

/// Total number of step attempts, retries included
///
/// Labels:
/// - `step`: Step name (e.g., `ipam`, `status`)
/// - `operation`: `create` or `delete`
pub static STEP_ATTEMPTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_step_attempts_total"),
        "Total number of pipeline step attempts by step and operation",
    );
    let counter = CounterVec::new(opts, &["step", "operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of step attempt outcomes
///
/// Labels:
/// - `step`: Step name
/// - `operation`: `create` or `delete`
/// - `outcome`: `success`, `error` or `canceled`
pub static STEP_OUTCOMES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_step_outcomes_total"),
        "Total number of pipeline step outcomes by step, operation and outcome",
    );
    let counter = CounterVec::new(opts, &["step", "operation", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of step attempts in seconds
///
/// Labels:
/// - `step`: Step name
/// - `operation`: `create` or `delete`
pub static STEP_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_step_duration_seconds"),
        "Duration of pipeline step attempts in seconds",
    )
    .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 120.0]);
    let histogram = HistogramVec::new(opts, &["step", "operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Lock Metrics
// ============================================================================

/// Total number of lock events
///
/// Labels:
/// - `lock`: Lock name
/// - `event`: `acquired`, `contended` or `timeout`
pub static LOCK_EVENTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_lock_events_total"),
        "Total number of allocation lock events by lock and event",
    );
    let counter = CounterVec::new(opts, &["lock", "event"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Time spent waiting for a lock before acquiring it
///
/// Labels:
/// - `lock`: Lock name
pub static LOCK_WAIT_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_lock_wait_seconds"),
        "Time spent waiting for the allocation lock in seconds",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0]);
    let histogram = HistogramVec::new(opts, &["lock"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Allocation Metrics
// ============================================================================

/// Total number of subnet allocations
///
/// Labels:
/// - `resource_type`: Kind of the object that received the subnet
/// - `status`: `allocated` or the CamelCase failure reason
pub static ALLOCATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_allocations_total"),
        "Total number of subnet allocations by resource type and status",
    );
    let counter = CounterVec::new(opts, &["resource_type", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Drain Metrics
// ============================================================================

/// Total number of drain state transitions
///
/// Labels:
/// - `from`: Previous drain state
/// - `to`: New drain state
pub static DRAIN_TRANSITIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_drain_transitions_total"),
        "Total number of node drain state transitions",
    );
    let counter = CounterVec::new(opts, &["from", "to"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
///
/// # Arguments
/// * `resource_type` - The kind of resource reconciled (e.g., `Cluster`)
/// * `duration` - Duration of the reconciliation
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
///
/// # Arguments
/// * `resource_type` - The kind of resource reconciled
/// * `duration` - Duration of the reconciliation before failure
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a reconciliation pass that a step canceled.
///
/// Canceled passes are not failures and are counted separately.
pub fn record_reconciliation_canceled(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "canceled"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a reconciliation requeue
///
/// # Arguments
/// * `resource_type` - The kind of resource reconciled
/// * `reason` - CamelCase reason of the error that caused the requeue
pub fn record_reconciliation_requeue(resource_type: &str, reason: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "requeue"])
        .inc();
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

/// Record one attempt of a pipeline step.
///
/// # Arguments
/// * `step` - Step name
/// * `operation` - `create` or `delete`
/// * `outcome` - One of [`OUTCOME_SUCCESS`], [`OUTCOME_ERROR`], [`OUTCOME_CANCELED`]
/// * `duration` - Duration of the attempt
pub fn record_step_attempt(step: &str, operation: &str, outcome: &str, duration: Duration) {
    STEP_ATTEMPTS_TOTAL
        .with_label_values(&[step, operation])
        .inc();
    STEP_OUTCOMES_TOTAL
        .with_label_values(&[step, operation, outcome])
        .inc();
    STEP_DURATION_SECONDS
        .with_label_values(&[step, operation])
        .observe(duration.as_secs_f64());
}

/// Record a lock acquisition and the time spent waiting for it
pub fn record_lock_acquired(lock: &str, waited: Duration) {
    LOCK_EVENTS_TOTAL
        .with_label_values(&[lock, "acquired"])
        .inc();
    LOCK_WAIT_SECONDS
        .with_label_values(&[lock])
        .observe(waited.as_secs_f64());
}

/// Record an acquire attempt that found the lock held by another owner
pub fn record_lock_contended(lock: &str) {
    LOCK_EVENTS_TOTAL
        .with_label_values(&[lock, "contended"])
        .inc();
}

/// Record giving up on a held lock
pub fn record_lock_timeout(lock: &str) {
    LOCK_EVENTS_TOTAL
        .with_label_values(&[lock, "timeout"])
        .inc();
}

/// Record the outcome of a subnet allocation cycle
///
/// # Arguments
/// * `resource_type` - Kind of the object that requested the subnet
/// * `status` - `allocated` or the CamelCase failure reason
pub fn record_allocation(resource_type: &str, status: &str) {
    ALLOCATIONS_TOTAL
        .with_label_values(&[resource_type, status])
        .inc();
}

/// Record a drain state transition
pub fn record_drain_transition(from: &str, to: &str) {
    DRAIN_TRANSITIONS_TOTAL.with_label_values(&[from, to]).inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Returns
/// Prometheus-formatted metrics as a String
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
