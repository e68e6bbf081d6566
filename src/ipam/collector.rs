// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Every subnet currently held in the pool.

use super::{parse_subnet, AllocationTarget, Range};
use crate::crd::{Cluster, NodePool};
use crate::errors::ReconcileError;
use crate::reconcilers::retry::retry_api_call;
use async_trait::async_trait;
use kube::api::ListParams;
use kube::{Api, Client};
use tracing::debug;

/// Lists the subnets held by all objects sharing the pool.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Subnets of every object holding one, including objects not being reconciled.
    ///
    /// # Errors
    ///
    /// Returns a transient error when listing fails, or
    /// [`ReconcileError::ExecutionFailed`] for an unparsable stored subnet.
    async fn collect_allocated(&self) -> Result<Vec<Range>, ReconcileError>;
}

/// [`Collector`] listing `Cluster` and `NodePool` objects cluster-wide.
///
/// Lists are served by the API server, not from a watch cache, so an allocation
/// committed by the previous lock holder is always visible.
#[derive(Clone)]
pub struct KubeCollector {
    client: Client,
}

impl KubeCollector {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn held_subnets<O: AllocationTarget>(objects: &[O]) -> Result<Vec<Range>, ReconcileError> {
    objects
        .iter()
        .filter_map(|o| o.subnet().map(|s| parse_subnet(&o.object_key(), s)))
        .collect()
}

#[async_trait]
impl Collector for KubeCollector {
    async fn collect_allocated(&self) -> Result<Vec<Range>, ReconcileError> {
        let clusters: Api<Cluster> = Api::all(self.client.clone());
        let node_pools: Api<NodePool> = Api::all(self.client.clone());
        let params = ListParams::default();

        let (clusters, node_pools) = futures::try_join!(
            retry_api_call(|| clusters.list(&params), "list clusters"),
            retry_api_call(|| node_pools.list(&params), "list node pools"),
        )?;

        let mut ranges = held_subnets(&clusters.items)?;
        ranges.extend(held_subnets(&node_pools.items)?);

        debug!(
            clusters = clusters.items.len(),
            node_pools = node_pools.items.len(),
            allocated = ranges.len(),
            "Collected allocated subnets"
        );
        Ok(ranges)
    }
}

#[cfg(test)]
#[path = "collector_tests.rs"]
mod collector_tests;
