// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for clusterops resources.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why a condition has
//! a particular status. All resources report a single encompassing `type: Ready`
//! condition.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   subnet: 10.4.0.0/16
//!   operatorVersion: 2.0.0
//!   conditions:
//!     - type: Ready
//!       status: "True"
//!       reason: Reconciled
//!       message: "Pipeline 2.0.0 converged"
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// Encompassing readiness condition type
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Condition status values
pub const CONDITION_STATUS_TRUE: &str = "True";
/// Condition status values
pub const CONDITION_STATUS_FALSE: &str = "False";

// ============================================================================
// Success Reasons
// ============================================================================

/// The pipeline converged the object to its desired state.
pub const REASON_RECONCILED: &str = "Reconciled";

/// The pass was canceled by a step waiting for a dependency.
///
/// Used while the object waits for something outside its own pipeline,
/// e.g. a node pool waiting for its cluster subnet.
pub const REASON_WAITING_FOR_DEPENDENCY: &str = "WaitingForDependency";

// ============================================================================
// Failure Reasons (one per error kind)
// ============================================================================

/// Misconfiguration detected while building or routing the pipeline.
pub const REASON_INVALID_CONFIG: &str = "InvalidConfig";

/// A referenced object does not exist.
pub const REASON_NOT_FOUND: &str = "NotFound";

/// A referenced object exists but is not ready.
pub const REASON_NOT_YET_AVAILABLE: &str = "NotYetAvailable";

/// Optimistic-concurrency write collision.
pub const REASON_CONFLICT: &str = "Conflict";

/// The allocation lock is held by another owner.
pub const REASON_LOCK_HELD: &str = "LockHeld";

/// Waiting for the allocation lock timed out.
pub const REASON_LOCK_TIMEOUT: &str = "LockTimeout";

/// Attempted release of a lock held by another owner.
pub const REASON_NOT_OWNER: &str = "NotOwner";

/// The address pool has no free range of the requested size.
///
/// Requires operator intervention (grow the pool or delete clusters).
pub const REASON_POOL_EXHAUSTED: &str = "PoolExhausted";

/// Internal invariant violation.
pub const REASON_EXECUTION_FAILED: &str = "ExecutionFailed";

/// Kubernetes API call failed.
pub const REASON_KUBERNETES_API_ERROR: &str = "KubernetesApiError";

// ============================================================================
// Drain Reasons
// ============================================================================

/// The scaling group scheduled the instance for termination; pods are being evicted.
pub const REASON_DRAIN_STARTED: &str = "DrainStarted";

/// All evictable pods left the node.
pub const REASON_DRAIN_COMPLETED: &str = "DrainCompleted";

/// The drain exceeded its timeout and was treated as complete.
pub const REASON_DRAIN_TIMED_OUT: &str = "DrainTimedOut";

/// The instance left the scaling group.
pub const REASON_INSTANCE_TERMINATED: &str = "InstanceTerminated";

/// The node or instance vanished before the drain finished.
pub const REASON_NODE_DISAPPEARED: &str = "NodeDisappeared";
