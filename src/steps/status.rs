// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Last step of every pipeline: publishes the `Ready` condition.

use crate::errors::ReconcileError;
use crate::pipeline::{ManagedObject, PassContext, Resource};
use crate::reconcilers::status::{condition_changed, create_condition, patch_status};
use crate::status_reasons::{CONDITION_STATUS_TRUE, CONDITION_TYPE_READY, REASON_RECONCILED};
use async_trait::async_trait;
use kube::core::NamespaceResourceScope;
use kube::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

const STEP_NAME: &str = "status";

/// Writes a status merge patch for an object.
#[async_trait]
pub trait StatusWriter<O>: Send + Sync {
    /// Merge `status` into the object's status subresource.
    async fn write(&self, obj: &O, status: Value) -> Result<(), ReconcileError>;
}

/// [`StatusWriter`] against the Kubernetes API.
pub struct KubeStatusWriter<O> {
    client: Client,
    _object: PhantomData<fn(&O)>,
}

impl<O> KubeStatusWriter<O> {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _object: PhantomData,
        }
    }
}

#[async_trait]
impl<O> StatusWriter<O> for KubeStatusWriter<O>
where
    O: ManagedObject + kube::Resource<Scope = NamespaceResourceScope> + DeserializeOwned,
{
    async fn write(&self, obj: &O, status: Value) -> Result<(), ReconcileError> {
        patch_status(&self.client, obj, status).await
    }
}

/// Status patch setting `Ready` to `status`, or `None` when the object already
/// reports exactly that for its current generation and `version`.
///
/// `lastTransitionTime` is kept while the condition status does not flip.
#[must_use]
pub fn ready_patch<O: ManagedObject>(
    obj: &O,
    version: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Option<Value> {
    let existing = obj.ready_condition();
    let mut condition = create_condition(CONDITION_TYPE_READY, status, reason, message);
    let generation = obj.meta().generation;

    let unchanged = !condition_changed(existing, &condition)
        && obj.observed_generation() == generation
        && obj.status_version() == Some(version);
    if unchanged {
        return None;
    }

    if let Some(previous) = existing.filter(|c| c.status == status) {
        condition
            .last_transition_time
            .clone_from(&previous.last_transition_time);
    }

    Some(json!({
        "conditions": [condition],
        "observedGeneration": generation,
        "operatorVersion": version,
    }))
}

/// Marks the object `Ready` once every previous step succeeded.
pub struct StatusResource<O> {
    writer: Arc<dyn StatusWriter<O>>,
}

impl<O> StatusResource<O> {
    #[must_use]
    pub fn new(writer: Arc<dyn StatusWriter<O>>) -> Self {
        Self { writer }
    }
}

/// `Ready` message naming the pipeline and whatever subnets the pass resolved.
pub(crate) fn ready_message(ctx: &PassContext) -> String {
    let mut message = format!("Reconciled by pipeline {}", ctx.version());
    if let Some(subnet) = ctx.subnet {
        message.push_str(&format!(" with subnet {subnet}"));
    }
    if let Some(cluster_subnet) = ctx.cluster_subnet {
        message.push_str(&format!(" in cluster {cluster_subnet}"));
    }
    message
}

#[async_trait]
impl<O: ManagedObject> Resource<O> for StatusResource<O> {
    fn name(&self) -> &str {
        STEP_NAME
    }

    async fn ensure_created(&self, obj: &O, ctx: &mut PassContext) -> Result<(), ReconcileError> {
        let message = ready_message(ctx);

        match ready_patch(obj, ctx.version(), CONDITION_STATUS_TRUE, REASON_RECONCILED, &message) {
            Some(patch) => self.writer.write(obj, patch).await,
            None => {
                debug!(object = ctx.object(), "Status unchanged");
                Ok(())
            }
        }
    }

    async fn ensure_deleted(&self, _obj: &O, _ctx: &mut PassContext) -> Result<(), ReconcileError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
