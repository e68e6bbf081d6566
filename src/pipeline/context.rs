// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-pass scratch record.

use super::ManagedObject;
use ipnet::Ipv4Net;

/// State shared by the steps of one reconciliation pass.
///
/// Created by the [`super::ResourceSet`] context initializer at pass start and
/// dropped at pass end. Nothing in here is persisted.
#[derive(Debug, Clone, Default)]
pub struct PassContext {
    version: String,
    object: String,
    canceled: Option<String>,
    /// Subnet held by the reconciled object, once known.
    pub subnet: Option<Ipv4Net>,
    /// Subnet of the parent `Cluster` when reconciling a `NodePool`.
    pub cluster_subnet: Option<Ipv4Net>,
}

impl PassContext {
    /// Create a context for `object` reconciled by pipeline `version`.
    #[must_use]
    pub fn new(version: &str, object: &str) -> Self {
        Self {
            version: version.to_string(),
            object: object.to_string(),
            ..Default::default()
        }
    }

    /// Default initializer: identity only, nothing discovered yet.
    #[must_use]
    pub fn for_object<O: ManagedObject>(version: &str, obj: &O) -> Self {
        Self::new(version, &obj.object_key())
    }

    /// Pipeline version running this pass.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// `namespace/name` of the object being reconciled.
    #[must_use]
    pub fn object(&self) -> &str {
        &self.object
    }

    /// Skip the remaining steps of this pass. The first reason wins.
    pub fn cancel(&mut self, reason: impl Into<String>) {
        if self.canceled.is_none() {
            self.canceled = Some(reason.into());
        }
    }

    /// Whether a step canceled the pass.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.canceled.is_some()
    }

    /// Reason given by the step that canceled the pass.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<&str> {
        self.canceled.as_deref()
    }
}
