// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Does an object still need a subnet?

use super::AllocationTarget;
use crate::errors::ReconcileError;
use crate::reconcilers::retry::retry_api_call;
use async_trait::async_trait;
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, ResourceExt};
use serde::de::DeserializeOwned;

/// Result of checking an object's allocation field.
#[derive(Debug, Clone)]
pub enum Check<O> {
    /// The object already holds this subnet.
    Allocated(String),
    /// The object needs a subnet. Carries the live copy that was checked, whose
    /// `resourceVersion` guards the later write.
    Unallocated(O),
}

impl<O> Check<O> {
    /// True iff the persisted allocation field is empty or unset.
    pub fn needs_allocation(&self) -> bool {
        matches!(self, Self::Unallocated(_))
    }
}

/// Reads the persisted allocation of an object.
#[async_trait]
pub trait Checker<O>: Send + Sync {
    /// Inspect the latest committed state of `obj`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::NotFound`] if the object was deleted, or a Kubernetes
    /// error if the read failed.
    async fn check(&self, obj: &O) -> Result<Check<O>, ReconcileError>;
}

/// [`Checker`] reading the object from the API server, bypassing any cache.
#[derive(Clone)]
pub struct KubeChecker {
    client: Client,
}

impl KubeChecker {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<O> Checker<O> for KubeChecker
where
    O: AllocationTarget + kube::Resource<Scope = NamespaceResourceScope> + DeserializeOwned,
{
    async fn check(&self, obj: &O) -> Result<Check<O>, ReconcileError> {
        let namespace = obj.namespace().unwrap_or_default();
        let name = obj.name_any();
        let api: Api<O> = Api::namespaced(self.client.clone(), &namespace);

        let live = retry_api_call(|| api.get(&name), &format!("get {}", obj.object_key()))
            .await
            .map_err(|e| match e {
                ReconcileError::Kube(err) => {
                    ReconcileError::from_kube(err, &O::kind(&()), &obj.object_key())
                }
                other => other,
            })?;

        Ok(match live.subnet() {
            Some(subnet) => Check::Allocated(subnet.to_string()),
            None => Check::Unallocated(live),
        })
    }
}
