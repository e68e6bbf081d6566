// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cordon and eviction through the cluster API.

use super::{NodeOperations, PodRef};
use crate::constants::FIELD_MANAGER;
use crate::errors::ReconcileError;
use crate::reconcilers::retry::retry_api_call;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{EvictParams, ListParams, Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use tracing::info;

/// Annotation marking static pods mirrored from the kubelet.
const MIRROR_POD_ANNOTATION: &str = "kubernetes.io/config.mirror";

/// [`NodeOperations`] against the Kubernetes API.
#[derive(Clone)]
pub struct KubeNodeOperations {
    client: Client,
}

impl KubeNodeOperations {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Whether `pod` has to leave the node before the node counts as drained.
///
/// `DaemonSet` pods and static pods are recreated on the node anyway, and
/// finished pods hold no workload.
pub(crate) fn is_evictable(pod: &Pod) -> bool {
    if pod.annotations().contains_key(MIRROR_POD_ANNOTATION) {
        return false;
    }
    if pod.owner_references().iter().any(|o| o.kind == "DaemonSet") {
        return false;
    }
    let phase = pod.status.as_ref().and_then(|s| s.phase.as_deref());
    !matches!(phase, Some("Succeeded" | "Failed"))
}

#[async_trait]
impl NodeOperations for KubeNodeOperations {
    async fn node_exists(&self, node: &str) -> Result<bool, ReconcileError> {
        let api: Api<Node> = Api::all(self.client.clone());
        let found = retry_api_call(|| api.get_opt(node), &format!("get node {node}")).await?;
        Ok(found.is_some())
    }

    async fn cordon(&self, node: &str) -> Result<(), ReconcileError> {
        let api: Api<Node> = Api::all(self.client.clone());
        let patch = json!({ "spec": { "unschedulable": true } });
        api.patch(node, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
            .await
            .map_err(|e| ReconcileError::from_kube(e, "Node", node))?;
        info!(node, "Cordoned node");
        Ok(())
    }

    async fn evictable_pods(&self, node: &str) -> Result<Vec<PodRef>, ReconcileError> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let params = ListParams::default().fields(&format!("spec.nodeName={node}"));
        let pods = retry_api_call(|| api.list(&params), &format!("list pods on {node}")).await?;

        Ok(pods
            .items
            .iter()
            .filter(|p| is_evictable(p))
            .map(|p| PodRef {
                namespace: p.namespace().unwrap_or_default(),
                name: p.name_any(),
            })
            .collect())
    }

    async fn evict(&self, pod: &PodRef) -> Result<bool, ReconcileError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &pod.namespace);
        match api.evict(&pod.name, &EvictParams::default()).await {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(true),
            Err(kube::Error::Api(e)) if e.code == 429 => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "nodes_tests.rs"]
mod nodes_tests;
