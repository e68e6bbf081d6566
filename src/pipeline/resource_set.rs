// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ordered step list of one pipeline version.

use super::{ManagedObject, PassContext, Resource};
use crate::errors::ReconcileError;
use tracing::{debug, info};

type Predicate<O> = Box<dyn Fn(&O) -> bool + Send + Sync>;
type ContextInit<O> = Box<dyn Fn(&str, &O) -> PassContext + Send + Sync>;

/// How a pass ended when no step failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every step ran.
    Completed,
    /// A step canceled the pass; later steps were skipped.
    Canceled {
        /// Step that canceled
        step: String,
        /// Reason it gave
        reason: String,
    },
}

/// Immutable pipeline: predicate, ordered steps and pass context initializer.
pub struct ResourceSet<O> {
    version: String,
    predicate: Predicate<O>,
    steps: Vec<Box<dyn Resource<O>>>,
    init: ContextInit<O>,
}

impl<O: ManagedObject> ResourceSet<O> {
    /// Build a set with an arbitrary predicate.
    pub fn new(
        version: &str,
        predicate: impl Fn(&O) -> bool + Send + Sync + 'static,
        steps: Vec<Box<dyn Resource<O>>>,
        init: impl Fn(&str, &O) -> PassContext + Send + Sync + 'static,
    ) -> Self {
        Self {
            version: version.to_string(),
            predicate: Box::new(predicate),
            steps,
            init: Box::new(init),
        }
    }

    /// Build a set handling objects whose version marker equals `version`.
    pub fn for_version(
        version: &str,
        steps: Vec<Box<dyn Resource<O>>>,
        init: impl Fn(&str, &O) -> PassContext + Send + Sync + 'static,
    ) -> Self {
        let wanted = version.to_string();
        Self::new(
            version,
            move |obj: &O| obj.version_marker() == Some(wanted.as_str()),
            steps,
            init,
        )
    }

    /// Pipeline version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Whether this set reconciles `obj`.
    pub fn handles(&self, obj: &O) -> bool {
        (self.predicate)(obj)
    }

    /// Step names in execution order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run one pass, in delete mode when `obj` is being deleted.
    ///
    /// # Errors
    ///
    /// Returns the first step error; later steps do not run. `NotFound` and
    /// `NotYetAvailable` step errors cancel the pass instead.
    pub async fn reconcile(&self, obj: &O) -> Result<PassOutcome, ReconcileError> {
        let mut ctx = (self.init)(&self.version, obj);
        let deleting = obj.is_deleting();

        for step in &self.steps {
            let result = if deleting {
                step.ensure_deleted(obj, &mut ctx).await
            } else {
                step.ensure_created(obj, &mut ctx).await
            };
            match result {
                Ok(()) => {}
                Err(e) if e.cancels_pass() => ctx.cancel(e.to_string()),
                Err(e) => return Err(e),
            }

            if let Some(reason) = ctx.cancel_reason() {
                info!(
                    version = %self.version,
                    object = ctx.object(),
                    step = step.name(),
                    reason,
                    "Pass canceled, skipping remaining steps"
                );
                return Ok(PassOutcome::Canceled {
                    step: step.name().to_string(),
                    reason: reason.to_string(),
                });
            }
        }

        debug!(version = %self.version, object = ctx.object(), deleting, "Pass completed");
        Ok(PassOutcome::Completed)
    }
}

#[cfg(test)]
#[path = "resource_set_tests.rs"]
mod resource_set_tests;
