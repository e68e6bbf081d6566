// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic finalizer management for namespaced resources.
//!
//! # Example
//!
//! ```rust,ignore
//! use clusterops::labels::PIPELINE_FINALIZER;
//! use clusterops::reconcilers::finalizers::{ensure_finalizer, remove_finalizer};
//!
//! async fn reconcile(client: Client, cluster: Cluster) -> Result<(), ReconcileError> {
//!     if cluster.metadata.deletion_timestamp.is_some() {
//!         // cleanup...
//!         return remove_finalizer(&client, &cluster, PIPELINE_FINALIZER).await;
//!     }
//!     ensure_finalizer(&client, &cluster, PIPELINE_FINALIZER).await?;
//!     Ok(())
//! }
//! ```

use crate::errors::ReconcileError;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::fmt::Debug;
use tracing::info;

/// Whether `resource` carries `finalizer`.
pub fn has_finalizer<T: Resource>(resource: &T, finalizer: &str) -> bool {
    resource.finalizers().iter().any(|f| f == finalizer)
}

/// Finalizer list of `resource` with `finalizer` added, `None` if already present.
pub(crate) fn with_finalizer<T: Resource>(resource: &T, finalizer: &str) -> Option<Vec<String>> {
    if has_finalizer(resource, finalizer) {
        return None;
    }
    let mut finalizers = resource.finalizers().to_vec();
    finalizers.push(finalizer.to_string());
    Some(finalizers)
}

/// Finalizer list of `resource` without `finalizer`, `None` if already absent.
pub(crate) fn without_finalizer<T: Resource>(
    resource: &T,
    finalizer: &str,
) -> Option<Vec<String>> {
    if !has_finalizer(resource, finalizer) {
        return None;
    }
    Some(
        resource
            .finalizers()
            .iter()
            .filter(|f| *f != finalizer)
            .cloned()
            .collect(),
    )
}

async fn patch_finalizers<T>(
    client: &Client,
    resource: &T,
    finalizers: Vec<String>,
) -> Result<(), ReconcileError>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope> + Clone + Debug + DeserializeOwned,
{
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .map_err(|e| ReconcileError::from_kube(e, &T::kind(&()), &name))?;
    Ok(())
}

/// Add a finalizer to a resource if not already present.
///
/// # Errors
///
/// Returns an error if the patch fails.
pub async fn ensure_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<(), ReconcileError>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope> + Clone + Debug + DeserializeOwned,
{
    let Some(finalizers) = with_finalizer(resource, finalizer) else {
        return Ok(());
    };

    patch_finalizers(client, resource, finalizers).await?;
    info!(
        kind = %T::kind(&()),
        namespace = %resource.namespace().unwrap_or_default(),
        name = %resource.name_any(),
        finalizer,
        "Added finalizer"
    );
    Ok(())
}

/// Remove a finalizer from a resource if present.
///
/// # Errors
///
/// Returns an error if the patch fails. A resource that is already gone counts as
/// released.
pub async fn remove_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<(), ReconcileError>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope> + Clone + Debug + DeserializeOwned,
{
    let Some(finalizers) = without_finalizer(resource, finalizer) else {
        return Ok(());
    };

    match patch_finalizers(client, resource, finalizers).await {
        Ok(()) | Err(ReconcileError::NotFound { .. }) => {}
        Err(e) => return Err(e),
    }
    info!(
        kind = %T::kind(&()),
        namespace = %resource.namespace().unwrap_or_default(),
        name = %resource.name_any(),
        finalizer,
        "Removed finalizer"
    );
    Ok(())
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
