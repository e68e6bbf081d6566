// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Safe termination of nodes during scale-down.
//!
//! Each node whose instance the scaling group scheduled for termination gets a
//! `NodeDrain` record (created by the node pool pipeline). The drainer polls every
//! record, observes the scaling group and the node, and moves the record through
//! [`machine::next_state`]. Entering `Draining` cordons the node and evicts its
//! pods; evictions are re-issued on every poll until the node is empty, because a
//! `PodDisruptionBudget` may refuse some of them.

mod machine;
mod nodes;
mod scaling_group;

pub use machine::{next_state, Observation, Transition};
pub use nodes::KubeNodeOperations;
pub use scaling_group::KubeScalingGroups;

use crate::crd::{DrainState, InstanceStatus, NodeDrain};
use crate::errors::ReconcileError;
use async_trait::async_trait;
use k8s_openapi::chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A pod scheduled on a node being drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
}

/// Read access to the cloud scaling groups.
#[async_trait]
pub trait ScalingGroups: Send + Sync {
    /// The drain's instance as reported by its scaling group; `None` once the
    /// instance left the group.
    ///
    /// # Errors
    ///
    /// Returns a Kubernetes error when the scaling group state cannot be read.
    async fn instance(&self, drain: &NodeDrain) -> Result<Option<InstanceStatus>, ReconcileError>;
}

/// Node and pod operations against the cluster API.
#[async_trait]
pub trait NodeOperations: Send + Sync {
    /// Whether the node object still exists.
    async fn node_exists(&self, node: &str) -> Result<bool, ReconcileError>;

    /// Mark the node unschedulable.
    async fn cordon(&self, node: &str) -> Result<(), ReconcileError>;

    /// Pods on the node that must leave before it is drained.
    async fn evictable_pods(&self, node: &str) -> Result<Vec<PodRef>, ReconcileError>;

    /// Request eviction of `pod`. Returns `false` when a disruption budget refused it.
    async fn evict(&self, pod: &PodRef) -> Result<bool, ReconcileError>;
}

/// Result of one drain poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainPoll {
    /// State change to persist, if any.
    pub transition: Option<Transition>,
    /// What the poll saw.
    pub observation: Observation,
}

impl DrainPoll {
    /// State after this poll.
    #[must_use]
    pub fn state(&self, before: DrainState) -> DrainState {
        self.transition.map_or(before, |t| t.to)
    }
}

/// Drives `NodeDrain` records through the drain state machine.
pub struct Drainer {
    groups: Arc<dyn ScalingGroups>,
    nodes: Arc<dyn NodeOperations>,
    timeout: Duration,
}

impl Drainer {
    #[must_use]
    pub fn new(
        groups: Arc<dyn ScalingGroups>,
        nodes: Arc<dyn NodeOperations>,
        timeout: Duration,
    ) -> Self {
        Self {
            groups,
            nodes,
            timeout,
        }
    }

    /// Observe `drain` at `now`, apply the side effects of the resulting state and
    /// return the transition to persist.
    ///
    /// # Errors
    ///
    /// Returns an error when the scaling group or the node cannot be read, or the
    /// node cannot be cordoned.
    pub async fn poll(&self, drain: &NodeDrain, now: DateTime<Utc>) -> Result<DrainPoll, ReconcileError> {
        let state = drain.state();
        let node = drain.spec.node_name.as_str();

        let instance = self.groups.instance(drain).await?;
        let node_exists = self.nodes.node_exists(node).await?;

        let pods = if state == DrainState::Draining && node_exists {
            self.nodes.evictable_pods(node).await?
        } else {
            Vec::new()
        };

        let observation = Observation {
            node_exists,
            instance_in_group: instance.is_some(),
            instance_terminating: instance
                .as_ref()
                .is_some_and(|i| i.lifecycle_state.is_terminating()),
            pods_remaining: pods.len(),
            draining_for: draining_for(drain, now),
        };

        let transition = next_state(state, &observation, self.timeout);
        match transition.map(|t| t.to) {
            Some(DrainState::Draining) => {
                info!(node, instance = %drain.spec.instance_id, "Draining node");
                self.nodes.cordon(node).await?;
                let pods = self.nodes.evictable_pods(node).await?;
                self.evict_all(node, &pods).await;
            }
            None if state == DrainState::Draining => {
                debug!(node, remaining = pods.len(), "Node still draining");
                self.evict_all(node, &pods).await;
            }
            _ => {}
        }

        Ok(DrainPoll {
            transition,
            observation,
        })
    }

    /// Evict every pod; failures are retried on the next poll.
    async fn evict_all(&self, node: &str, pods: &[PodRef]) {
        for pod in pods {
            match self.nodes.evict(pod).await {
                Ok(true) => debug!(node, pod = %pod.name, namespace = %pod.namespace, "Evicted pod"),
                Ok(false) => debug!(
                    node,
                    pod = %pod.name,
                    namespace = %pod.namespace,
                    "Eviction refused by disruption budget"
                ),
                Err(e) => warn!(node, pod = %pod.name, namespace = %pod.namespace, error = %e, "Eviction failed"),
            }
        }
    }
}

/// Time since the drain entered `Draining`.
fn draining_for(drain: &NodeDrain, now: DateTime<Utc>) -> Option<Duration> {
    let since = drain.status.as_ref()?.draining_since.as_deref()?;
    let since = DateTime::parse_from_rfc3339(since).ok()?.with_timezone(&Utc);
    (now - since).to_std().ok()
}
