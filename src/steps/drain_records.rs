// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Node pool step keeping one `NodeDrain` record per terminating instance.
//!
//! The desired records are the instances the scaling group reports as terminating,
//! plus every existing record whose drain has not reached `Terminated` yet. A record
//! therefore disappears only once its instance left the group and the drainer
//! finished with it. Deleting the node pool deletes all of its records.

use crate::crd::{DrainState, NodeDrain, NodeDrainSpec, NodePool};
use crate::errors::ReconcileError;
use crate::labels::{
    CLUSTER_LABEL, K8S_MANAGED_BY, K8S_PART_OF, MANAGED_BY_NODE_POOL, NODE_POOL_LABEL,
    PART_OF_CLUSTEROPS,
};
use crate::pipeline::{CrudOps, PassContext};
use crate::reconcilers::retry::retry_api_call;
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{Api, Client, Resource as _, ResourceExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

const STEP_NAME: &str = "drain-records";

/// One drain record, as seen by the step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainEntry {
    /// `NodeDrain` object name
    pub name: String,
    pub node_name: String,
    pub state: DrainState,
}

/// Drain records keyed by instance id.
pub type DrainRecordMap = BTreeMap<String, DrainEntry>;

/// Storage of `NodeDrain` records.
#[async_trait]
pub trait DrainRecordStore: Send + Sync {
    /// Records belonging to `pool`.
    async fn list(&self, pool: &NodePool) -> Result<Vec<NodeDrain>, ReconcileError>;

    /// Create `record`. Creating an existing record is a no-op.
    async fn create(&self, record: &NodeDrain) -> Result<(), ReconcileError>;

    /// Delete record `name`. Deleting a missing record is a no-op.
    async fn delete(&self, namespace: &str, name: &str) -> Result<(), ReconcileError>;
}

/// [`DrainRecordStore`] against the Kubernetes API.
#[derive(Clone)]
pub struct KubeDrainRecordStore {
    client: Client,
}

impl KubeDrainRecordStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DrainRecordStore for KubeDrainRecordStore {
    async fn list(&self, pool: &NodePool) -> Result<Vec<NodeDrain>, ReconcileError> {
        let namespace = pool.namespace().unwrap_or_default();
        let api: Api<NodeDrain> = Api::namespaced(self.client.clone(), &namespace);
        let params =
            ListParams::default().labels(&format!("{NODE_POOL_LABEL}={}", pool.name_any()));
        let list = retry_api_call(
            || api.list(&params),
            &format!("list NodeDrains of {namespace}/{}", pool.name_any()),
        )
        .await?;
        Ok(list.items)
    }

    async fn create(&self, record: &NodeDrain) -> Result<(), ReconcileError> {
        let namespace = record.namespace().unwrap_or_default();
        let api: Api<NodeDrain> = Api::namespaced(self.client.clone(), &namespace);
        match api.create(&PostParams::default(), record).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 409 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), ReconcileError> {
        let api: Api<NodeDrain> = Api::namespaced(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Name of the drain record for `instance_id` in `pool`.
#[must_use]
pub fn record_name(pool: &str, instance_id: &str) -> String {
    let raw = format!("{pool}-{instance_id}").to_lowercase();
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

/// Drain record for `instance_id` on `node_name`, owned by `pool`.
#[must_use]
pub fn build_record(pool: &NodePool, instance_id: &str, node_name: &str) -> NodeDrain {
    let pool_name = pool.name_any();
    let labels = BTreeMap::from([
        (K8S_MANAGED_BY.to_string(), MANAGED_BY_NODE_POOL.to_string()),
        (K8S_PART_OF.to_string(), PART_OF_CLUSTEROPS.to_string()),
        (NODE_POOL_LABEL.to_string(), pool_name.clone()),
        (CLUSTER_LABEL.to_string(), pool.spec.cluster_ref.clone()),
    ]);

    NodeDrain {
        metadata: ObjectMeta {
            name: Some(record_name(&pool_name, instance_id)),
            namespace: pool.namespace(),
            labels: Some(labels),
            owner_references: pool.controller_owner_ref(&()).map(|r| vec![r]),
            ..Default::default()
        },
        spec: NodeDrainSpec {
            node_name: node_name.to_string(),
            instance_id: instance_id.to_string(),
            node_pool_ref: pool_name,
        },
        status: None,
    }
}

/// Index existing records by instance id.
#[must_use]
pub fn index_records(records: &[NodeDrain]) -> DrainRecordMap {
    records
        .iter()
        .map(|r| {
            (
                r.spec.instance_id.clone(),
                DrainEntry {
                    name: r.name_any(),
                    node_name: r.spec.node_name.clone(),
                    state: r.state(),
                },
            )
        })
        .collect()
}

/// Records that should exist for `pool` given the `existing` ones.
#[must_use]
pub fn desired_records(pool: &NodePool, existing: &DrainRecordMap) -> DrainRecordMap {
    let pool_name = pool.name_any();
    let instances = pool
        .status
        .as_ref()
        .and_then(|s| s.scaling_group.as_ref())
        .map(|g| g.instances.as_slice())
        .unwrap_or_default();

    let mut desired: DrainRecordMap = instances
        .iter()
        .filter(|i| i.lifecycle_state.is_terminating())
        .filter_map(|i| {
            // Instances that never joined the cluster have no node to drain.
            let node_name = i.node_name.as_ref()?;
            let entry = existing.get(&i.instance_id).cloned().unwrap_or(DrainEntry {
                name: record_name(&pool_name, &i.instance_id),
                node_name: node_name.clone(),
                state: DrainState::Pending,
            });
            Some((i.instance_id.clone(), entry))
        })
        .collect();

    for (instance_id, entry) in existing {
        if entry.state != DrainState::Terminated {
            desired
                .entry(instance_id.clone())
                .or_insert_with(|| entry.clone());
        }
    }

    desired
}

/// CRUD operations converging a node pool's `NodeDrain` records.
pub struct DrainRecords {
    store: Arc<dyn DrainRecordStore>,
}

impl DrainRecords {
    #[must_use]
    pub fn new(store: Arc<dyn DrainRecordStore>) -> Self {
        Self { store }
    }

}

#[async_trait]
impl CrudOps<NodePool> for DrainRecords {
    type State = DrainRecordMap;

    fn name(&self) -> &str {
        STEP_NAME
    }

    async fn current_state(
        &self,
        pool: &NodePool,
        _ctx: &mut PassContext,
    ) -> Result<DrainRecordMap, ReconcileError> {
        Ok(index_records(&self.store.list(pool).await?))
    }

    async fn desired_state(
        &self,
        pool: &NodePool,
        current: &DrainRecordMap,
        _ctx: &mut PassContext,
    ) -> Result<DrainRecordMap, ReconcileError> {
        Ok(desired_records(pool, current))
    }

    fn create_change(
        &self,
        current: &DrainRecordMap,
        desired: &DrainRecordMap,
    ) -> Option<DrainRecordMap> {
        let missing: DrainRecordMap = desired
            .iter()
            .filter(|(id, _)| !current.contains_key(*id))
            .map(|(id, e)| (id.clone(), e.clone()))
            .collect();
        (!missing.is_empty()).then_some(missing)
    }

    fn delete_change(
        &self,
        current: &DrainRecordMap,
        desired: &DrainRecordMap,
    ) -> Option<DrainRecordMap> {
        let stale: DrainRecordMap = current
            .iter()
            .filter(|(id, _)| !desired.contains_key(*id))
            .map(|(id, e)| (id.clone(), e.clone()))
            .collect();
        (!stale.is_empty()).then_some(stale)
    }

    async fn apply_create(
        &self,
        pool: &NodePool,
        ctx: &mut PassContext,
        change: DrainRecordMap,
    ) -> Result<(), ReconcileError> {
        for (instance_id, entry) in change {
            let record = build_record(pool, &instance_id, &entry.node_name);
            self.store.create(&record).await?;
            info!(
                object = ctx.object(),
                instance = %instance_id,
                node = %entry.node_name,
                "Created drain record"
            );
        }
        Ok(())
    }

    async fn apply_delete(
        &self,
        pool: &NodePool,
        ctx: &mut PassContext,
        change: DrainRecordMap,
    ) -> Result<(), ReconcileError> {
        let namespace = pool.namespace().unwrap_or_default();
        for (instance_id, entry) in change {
            self.store.delete(&namespace, &entry.name).await?;
            info!(
                object = ctx.object(),
                instance = %instance_id,
                state = %entry.state,
                "Deleted drain record"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "drain_records_tests.rs"]
mod drain_records_tests;
