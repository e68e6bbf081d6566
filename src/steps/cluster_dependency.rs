// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! First step of the node pool pipeline: waits for the parent `Cluster`.

use crate::crd::{Cluster, NodePool};
use crate::errors::ReconcileError;
use crate::ipam::{parse_subnet, AllocationTarget};
use crate::pipeline::{ManagedObject, PassContext, Resource};
use crate::reconcilers::retry::retry_api_call;
use async_trait::async_trait;
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use tracing::debug;

const STEP_NAME: &str = "cluster-dependency";

/// Looks up the `Cluster` a node pool belongs to.
#[async_trait]
pub trait ClusterLookup: Send + Sync {
    /// The cluster `name` in `namespace`, `None` when it does not exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Cluster>, ReconcileError>;
}

/// [`ClusterLookup`] against the Kubernetes API.
#[derive(Clone)]
pub struct KubeClusterLookup {
    client: Client,
}

impl KubeClusterLookup {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterLookup for KubeClusterLookup {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Cluster>, ReconcileError> {
        let api: Api<Cluster> = Api::namespaced(self.client.clone(), namespace);
        retry_api_call(|| api.get_opt(name), &format!("get Cluster {namespace}/{name}")).await
    }
}

/// Cancels the pass until the parent cluster exists and holds a subnet.
///
/// A node pool is useless without its cluster network, so nothing downstream runs
/// before it is there. The delete pass does not wait.
pub struct ClusterDependency {
    lookup: Arc<dyn ClusterLookup>,
}

impl ClusterDependency {
    #[must_use]
    pub fn new(lookup: Arc<dyn ClusterLookup>) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl Resource<NodePool> for ClusterDependency {
    fn name(&self) -> &str {
        STEP_NAME
    }

    async fn ensure_created(
        &self,
        pool: &NodePool,
        ctx: &mut PassContext,
    ) -> Result<(), ReconcileError> {
        let namespace = pool.namespace().unwrap_or_default();
        let cluster_name = pool.spec.cluster_ref.as_str();

        let Some(cluster) = self.lookup.get(&namespace, cluster_name).await? else {
            ctx.cancel(format!("Cluster {namespace}/{cluster_name} not found"));
            return Ok(());
        };

        if cluster.is_deleting() {
            ctx.cancel(format!("Cluster {namespace}/{cluster_name} is being deleted"));
            return Ok(());
        }

        let Some(subnet) = cluster.subnet() else {
            ctx.cancel(format!(
                "Cluster {namespace}/{cluster_name} has no subnet yet"
            ));
            return Ok(());
        };

        let subnet = parse_subnet(&cluster.object_key(), subnet)?;
        debug!(object = ctx.object(), cluster = cluster_name, %subnet, "Cluster ready");
        ctx.cluster_subnet = Some(subnet);
        Ok(())
    }

    async fn ensure_deleted(
        &self,
        _pool: &NodePool,
        _ctx: &mut PassContext,
    ) -> Result<(), ReconcileError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "cluster_dependency_tests.rs"]
mod cluster_dependency_tests;
