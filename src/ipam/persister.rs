// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Compare-and-swap write of an allocated subnet.

use super::{AllocationTarget, Range};
use crate::constants::FIELD_MANAGER;
use crate::errors::ReconcileError;
use async_trait::async_trait;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, ResourceExt};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::info;

/// Writes an allocation into the object status.
#[async_trait]
pub trait Persister<O>: Send + Sync {
    /// Store `range` as the subnet of `live`, provided `live` is still current.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Conflict`] when the object changed since `live`
    /// was read. The caller must restart the allocation cycle rather than retry
    /// the write.
    async fn persist(&self, live: &O, range: Range) -> Result<(), ReconcileError>;
}

/// [`Persister`] patching the status subresource.
///
/// The patch carries `metadata.resourceVersion`, which the API server treats as a
/// precondition and rejects with 409 if the object moved on.
#[derive(Clone)]
pub struct KubePersister {
    client: Client,
}

impl KubePersister {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Status patch storing `range`, preconditioned on the `resourceVersion` of `live`.
///
/// # Errors
///
/// Returns [`ReconcileError::ExecutionFailed`] when `live` carries no
/// `resourceVersion`, since the write would then be unconditional.
pub(crate) fn subnet_patch<O: AllocationTarget>(live: &O, range: Range) -> Result<Value, ReconcileError> {
    let Some(resource_version) = live.resource_version() else {
        return Err(ReconcileError::ExecutionFailed(format!(
            "{} has no resourceVersion; refusing unconditional subnet write",
            live.object_key()
        )));
    };
    Ok(json!({
        "metadata": { "resourceVersion": resource_version },
        "status": { "subnet": range.to_string() }
    }))
}

#[async_trait]
impl<O> Persister<O> for KubePersister
where
    O: AllocationTarget + kube::Resource<Scope = NamespaceResourceScope> + DeserializeOwned,
{
    async fn persist(&self, live: &O, range: Range) -> Result<(), ReconcileError> {
        let key = live.object_key();
        let patch = subnet_patch(live, range)?;

        let api: Api<O> = Api::namespaced(self.client.clone(), &live.namespace().unwrap_or_default());

        api.patch_status(
            &live.name_any(),
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&patch),
        )
        .await
        .map_err(|e| ReconcileError::from_kube(e, &O::kind(&()), &key))?;

        info!(object = %key, subnet = %range, "Persisted subnet allocation");
        Ok(())
    }
}

#[cfg(test)]
#[path = "persister_tests.rs"]
mod persister_tests;
