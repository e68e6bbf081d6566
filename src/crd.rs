// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for cluster lifecycle management.
//!
//! This module defines all Kubernetes Custom Resource Definitions used by clusterops
//! to manage cluster infrastructure declaratively.
//!
//! # Resource Types
//!
//! - [`Cluster`] - A tenant cluster; receives a subnet carved from the shared pool
//! - [`NodePool`] - A group of worker nodes backed by a cloud scaling group
//! - [`NodeDrain`] - A drain record tracking the safe termination of one node
//!
//! Every `Cluster` and `NodePool` carries the
//! `clusterops.firestoned.io/operator-version` label. The label selects the pipeline
//! version that reconciles the object, so objects can migrate between pipeline
//! versions one at a time.
//!
//! # Example: Creating a Node Pool
//!
//! ```rust,no_run
//! use clusterops::crd::NodePoolSpec;
//!
//! let spec = NodePoolSpec {
//!     cluster_ref: "prod-eu".to_string(),
//!     min_size: 3,
//!     max_size: 10,
//!     instance_type: Some("m5.xlarge".to_string()),
//!     subnet_mask_bits: None,
//! };
//! ```

use crate::ipam::AllocationTarget;
use crate::labels::OPERATOR_VERSION_LABEL;
use crate::pipeline::ManagedObject;
use crate::reconcilers::status::find_condition;
use crate::status_reasons::CONDITION_TYPE_READY;
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition represents an observation of a resource's current state.
///
/// Conditions are used in status subresources to communicate the state of
/// a resource to users and controllers.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. Common types include: Ready, Progressing, Degraded.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

// ============================================================================
// Cluster
// ============================================================================

/// `Cluster` describes a tenant cluster whose infrastructure the operator converges.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[kube(
    group = "clusterops.firestoned.io",
    version = "v1alpha1",
    kind = "Cluster",
    namespaced,
    doc = "Cluster represents a tenant cluster. The operator allocates it a subnet from the shared pool and converges its infrastructure through the pipeline selected by its operator-version label.",
    printcolumn = r#"{"name":"Subnet","type":"string","jsonPath":".status.subnet"}"#,
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".metadata.labels.clusterops\\.firestoned\\.io/operator-version"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[kube(status = "ClusterStatus")]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Human readable description of the cluster.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Prefix length of the cluster subnet. Defaults to the operator-wide setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 8, max = 30))]
    pub subnet_mask_bits: Option<u8>,
}

/// `Cluster` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    /// Subnet allocated to this cluster. Empty until allocation succeeds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
    /// Pipeline version that last reconciled this object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator_version: Option<String>,
}

// ============================================================================
// NodePool
// ============================================================================

/// `NodePool` describes a group of worker nodes of a `Cluster`.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[kube(
    group = "clusterops.firestoned.io",
    version = "v1alpha1",
    kind = "NodePool",
    namespaced,
    doc = "NodePool represents a group of worker nodes backed by a cloud scaling group. Each node pool receives its own subnet from the shared pool.",
    printcolumn = r#"{"name":"Cluster","type":"string","jsonPath":".spec.clusterRef"}"#,
    printcolumn = r#"{"name":"Subnet","type":"string","jsonPath":".status.subnet"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[kube(status = "NodePoolStatus")]
#[serde(rename_all = "camelCase")]
pub struct NodePoolSpec {
    /// Name of the `Cluster` in the same namespace this node pool belongs to.
    pub cluster_ref: String,

    /// Minimum number of nodes in the scaling group.
    #[schemars(range(min = 0))]
    pub min_size: i32,

    /// Maximum number of nodes in the scaling group.
    #[schemars(range(min = 0))]
    pub max_size: i32,

    /// Instance type of the nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,

    /// Prefix length of the node pool subnet. Defaults to the operator-wide setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 8, max = 30))]
    pub subnet_mask_bits: Option<u8>,
}

/// `NodePool` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    /// Subnet allocated to this node pool. Empty until allocation succeeds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
    /// Pipeline version that last reconciled this object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator_version: Option<String>,
    /// Scaling group state as reported by the cloud provider integration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaling_group: Option<ScalingGroupStatus>,
}

/// Observed state of the cloud scaling group backing a node pool.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScalingGroupStatus {
    /// Provider name of the scaling group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Instances currently registered in the scaling group.
    #[serde(default)]
    pub instances: Vec<InstanceStatus>,
}

/// One compute instance in a scaling group.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStatus {
    /// Provider identifier of the instance.
    pub instance_id: String,
    /// Kubernetes node name of the instance, once it joined the cluster.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    /// Lifecycle state reported by the scaling group.
    pub lifecycle_state: LifecycleState,
}

/// Scaling group lifecycle state of an instance.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum LifecycleState {
    /// Instance is launching.
    Pending,
    /// Instance is serving.
    InService,
    /// Instance is scheduled for replacement or termination and waits for the drain.
    Terminating,
    /// Instance has been terminated.
    Terminated,
}

impl LifecycleState {
    /// Whether the scaling group scheduled this instance for removal.
    #[must_use]
    pub fn is_terminating(self) -> bool {
        matches!(self, Self::Terminating | Self::Terminated)
    }
}

// ============================================================================
// NodeDrain
// ============================================================================

/// `NodeDrain` tracks the drain of one node scheduled for termination.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[kube(
    group = "clusterops.firestoned.io",
    version = "v1alpha1",
    kind = "NodeDrain",
    namespaced,
    doc = "NodeDrain records the drain of a node whose instance the scaling group scheduled for termination. The drainer cordons the node, evicts its pods and releases the record once the instance left the scaling group.",
    printcolumn = r#"{"name":"Node","type":"string","jsonPath":".spec.nodeName"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#
)]
#[kube(status = "NodeDrainStatus")]
#[serde(rename_all = "camelCase")]
pub struct NodeDrainSpec {
    /// Kubernetes node to drain.
    pub node_name: String,
    /// Provider identifier of the instance behind the node.
    pub instance_id: String,
    /// `NodePool` whose scaling group owns the instance.
    pub node_pool_ref: String,
}

/// `NodeDrain` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeDrainStatus {
    #[serde(default)]
    pub state: DrainState,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// When the node entered `Draining` (RFC3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draining_since: Option<String>,
    /// When the record last changed state (RFC3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Drain lifecycle state of a node.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum DrainState {
    /// Record exists; the node has not been touched yet.
    #[default]
    Pending,
    /// Node is cordoned and its pods are being evicted.
    Draining,
    /// All pods left the node; waiting for the instance to leave the scaling group.
    Drained,
    /// Instance is gone. Terminal.
    Terminated,
}

impl fmt::Display for DrainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Draining => "Draining",
            Self::Drained => "Drained",
            Self::Terminated => "Terminated",
        };
        f.write_str(s)
    }
}

impl NodeDrain {
    /// Current drain state; records without status are `Pending`.
    #[must_use]
    pub fn state(&self) -> DrainState {
        self.status.as_ref().map(|s| s.state).unwrap_or_default()
    }
}

// ============================================================================
// Pipeline integration
// ============================================================================

fn ready_condition(conditions: &[Condition]) -> Option<&Condition> {
    find_condition(conditions, CONDITION_TYPE_READY)
}

impl ManagedObject for Cluster {
    fn version_marker(&self) -> Option<&str> {
        self.labels().get(OPERATOR_VERSION_LABEL).map(String::as_str)
    }

    fn ready_condition(&self) -> Option<&Condition> {
        self.status
            .as_ref()
            .and_then(|s| ready_condition(&s.conditions))
    }

    fn observed_generation(&self) -> Option<i64> {
        self.status.as_ref().and_then(|s| s.observed_generation)
    }

    fn status_version(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.operator_version.as_deref())
    }
}

impl ManagedObject for NodePool {
    fn version_marker(&self) -> Option<&str> {
        self.labels().get(OPERATOR_VERSION_LABEL).map(String::as_str)
    }

    fn ready_condition(&self) -> Option<&Condition> {
        self.status
            .as_ref()
            .and_then(|s| ready_condition(&s.conditions))
    }

    fn observed_generation(&self) -> Option<i64> {
        self.status.as_ref().and_then(|s| s.observed_generation)
    }

    fn status_version(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.operator_version.as_deref())
    }
}

impl AllocationTarget for Cluster {
    fn subnet(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.subnet.as_deref())
            .filter(|s| !s.is_empty())
    }

    fn mask_bits_override(&self) -> Option<u8> {
        self.spec.subnet_mask_bits
    }
}

impl AllocationTarget for NodePool {
    fn subnet(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.subnet.as_deref())
            .filter(|s| !s.is_empty())
    }

    fn mask_bits_override(&self) -> Option<u8> {
        self.spec.subnet_mask_bits
    }
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
