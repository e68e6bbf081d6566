// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Scaling group state as published on the owning `NodePool`.

use super::ScalingGroups;
use crate::crd::{InstanceStatus, NodeDrain, NodePool};
use crate::errors::ReconcileError;
use crate::reconcilers::retry::retry_api_call;
use async_trait::async_trait;
use kube::{Api, Client, ResourceExt};

/// Reads instances from `NodePool.status.scalingGroup`.
#[derive(Clone)]
pub struct KubeScalingGroups {
    client: Client,
}

impl KubeScalingGroups {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// The instance with `instance_id` in the pool's scaling group.
pub(crate) fn find_instance(pool: &NodePool, instance_id: &str) -> Option<InstanceStatus> {
    pool.status
        .as_ref()?
        .scaling_group
        .as_ref()?
        .instances
        .iter()
        .find(|i| i.instance_id == instance_id)
        .cloned()
}

#[async_trait]
impl ScalingGroups for KubeScalingGroups {
    async fn instance(&self, drain: &NodeDrain) -> Result<Option<InstanceStatus>, ReconcileError> {
        let namespace = drain.namespace().unwrap_or_default();
        let api: Api<NodePool> = Api::namespaced(self.client.clone(), &namespace);
        let pool_name = drain.spec.node_pool_ref.as_str();

        let pool = retry_api_call(
            || api.get_opt(pool_name),
            &format!("get NodePool {namespace}/{pool_name}"),
        )
        .await?;

        // A deleted pool takes its scaling group and instances with it.
        Ok(pool.and_then(|p| find_instance(&p, &drain.spec.instance_id)))
    }
}

#[cfg(test)]
#[path = "scaling_group_tests.rs"]
mod scaling_group_tests;
