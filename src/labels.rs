// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label, annotation and finalizer constants used across all reconcilers.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

/// Value for `app.kubernetes.io/part-of` indicating this resource is part of clusterops
pub const PART_OF_CLUSTEROPS: &str = "clusterops";

/// Value for `app.kubernetes.io/managed-by` on resources created by the `NodePool` pipeline
pub const MANAGED_BY_NODE_POOL: &str = "NodePool";

// ============================================================================
// clusterops-Specific Labels
// ============================================================================

/// Version marker selecting the pipeline that reconciles an object
pub const OPERATOR_VERSION_LABEL: &str = "clusterops.firestoned.io/operator-version";

/// Name of the `Cluster` an object belongs to
pub const CLUSTER_LABEL: &str = "clusterops.firestoned.io/cluster";

/// Name of the `NodePool` a `NodeDrain` belongs to
pub const NODE_POOL_LABEL: &str = "clusterops.firestoned.io/node-pool";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer blocking deletion of clusters and node pools until their delete pass completes
pub const PIPELINE_FINALIZER: &str = "clusterops.firestoned.io/finalizer";

/// Finalizer blocking deletion of a `NodeDrain` until the instance is terminated
pub const DRAIN_FINALIZER: &str = "clusterops.firestoned.io/drain";
