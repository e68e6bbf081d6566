// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the clusterops operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for all clusterops CRDs
pub const API_GROUP: &str = "clusterops.firestoned.io";

/// API version for all clusterops CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "clusterops.firestoned.io/v1alpha1";

/// Kind name for `Cluster` resource
pub const KIND_CLUSTER: &str = "Cluster";

/// Kind name for `NodePool` resource
pub const KIND_NODE_POOL: &str = "NodePool";

/// Kind name for `NodeDrain` resource
pub const KIND_NODE_DRAIN: &str = "NodeDrain";

/// Component name used in lock owner identities and field managers
pub const COMPONENT_NAME: &str = "clusterops";

/// Field manager for server-side apply and merge patches
pub const FIELD_MANAGER: &str = "clusterops-controller";

// ============================================================================
// Subnet Allocation Constants
// ============================================================================

/// Default root address pool for cluster and node pool subnets
pub const DEFAULT_POOL_CIDR: &str = "10.0.0.0/8";

/// Default prefix length of a cluster subnet
pub const DEFAULT_CLUSTER_MASK_BITS: u8 = 16;

/// Default prefix length of a node pool subnet
pub const DEFAULT_NODE_POOL_MASK_BITS: u8 = 24;

/// Number of allocate cycles attempted when the status write conflicts
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 3;

// ============================================================================
// Lock Constants
// ============================================================================

/// Namespace holding the subnet allocation leases
pub const DEFAULT_LOCK_NAMESPACE: &str = "clusterops-system";

/// Lock name prefix; the pool name is appended
pub const LOCK_NAME_PREFIX: &str = "clusterops-ipam";

/// Default lease time-to-live (30 seconds)
pub const DEFAULT_LOCK_TTL_SECS: u64 = 30;

/// Default maximum time spent waiting for the allocation lock (2 minutes)
pub const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 120;

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue duration for objects whose error cannot be fixed by retrying (10 minutes)
pub const PERMANENT_ERROR_REQUEUE_DURATION_SECS: u64 = 600;

/// Resync interval for objects that reconciled successfully (5 minutes)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;

/// Requeue duration after a canceled pass (30 seconds)
pub const CANCELED_REQUEUE_DURATION_SECS: u64 = 30;

/// Default number of objects reconciled in parallel per controller
pub const DEFAULT_CONTROLLER_CONCURRENCY: u16 = 8;

/// Default number of attempts for a step before the pass gives up
pub const DEFAULT_STEP_MAX_ATTEMPTS: u32 = 3;

// ============================================================================
// Drainer Constants
// ============================================================================

/// Poll interval while a node is draining (15 seconds)
pub const DRAIN_POLL_INTERVAL_SECS: u64 = 15;

/// Poll interval for drains waiting on the scaling group (60 seconds)
pub const DRAIN_IDLE_POLL_INTERVAL_SECS: u64 = 60;

/// Default time after which a drain is considered complete even if pods remain (10 minutes)
pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 600;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Default bind address for the metrics and probe server
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";

// ============================================================================
// Supported Pipeline Versions
// ============================================================================

/// Legacy pipeline version; node pools are not drained by this version
pub const PIPELINE_VERSION_V1: &str = "1.0.0";

/// Current pipeline version
pub const PIPELINE_VERSION_V2: &str = "2.0.0";
