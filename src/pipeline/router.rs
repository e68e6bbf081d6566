// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Selects the pipeline version that reconciles an object.
//!
//! Objects migrate between versions one at a time by changing their version
//! marker, so several [`ResourceSet`]s run side by side. Exactly one set may claim
//! an object; ambiguity is a configuration error.

use super::{ManagedObject, ResourceSet};
use crate::errors::ReconcileError;
use std::collections::HashSet;

/// Fixed-order collection of [`ResourceSet`]s.
pub struct VersionRouter<O> {
    sets: Vec<ResourceSet<O>>,
}

impl<O: ManagedObject> VersionRouter<O> {
    /// Create a router evaluating `sets` in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidConfig`] when `sets` is empty or two sets
    /// share a version.
    pub fn new(sets: Vec<ResourceSet<O>>) -> Result<Self, ReconcileError> {
        if sets.is_empty() {
            return Err(ReconcileError::InvalidConfig(
                "at least one pipeline version must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for set in &sets {
            if !seen.insert(set.version()) {
                return Err(ReconcileError::InvalidConfig(format!(
                    "pipeline version {} is configured twice",
                    set.version()
                )));
            }
        }

        Ok(Self { sets })
    }

    /// Versions in evaluation order.
    #[must_use]
    pub fn versions(&self) -> Vec<&str> {
        self.sets.iter().map(ResourceSet::version).collect()
    }

    /// The single set handling `obj`.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::NotFound`] when no set handles the object's version
    /// - [`ReconcileError::InvalidConfig`] when more than one does
    pub fn select(&self, obj: &O) -> Result<&ResourceSet<O>, ReconcileError> {
        let mut matching = self.sets.iter().filter(|s| s.handles(obj));

        let Some(first) = matching.next() else {
            return Err(ReconcileError::NotFound {
                kind: "pipeline for version".to_string(),
                name: obj.version_marker().unwrap_or("<unset>").to_string(),
            });
        };

        if let Some(second) = matching.next() {
            return Err(ReconcileError::InvalidConfig(format!(
                "object {} matches pipeline versions {} and {}",
                obj.object_key(),
                first.version(),
                second.version()
            )));
        }

        Ok(first)
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod router_tests;
