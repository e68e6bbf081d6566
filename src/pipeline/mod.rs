// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Versioned reconciliation pipelines.
//!
//! A pipeline is an ordered list of idempotent steps ([`Resource`]) run against one
//! managed object per pass. Steps share an explicit per-pass scratch record
//! ([`PassContext`]) and may cancel the rest of the pass without failing it.
//!
//! # Building blocks
//!
//! - [`Resource`] - the object-safe step contract
//! - [`CrudOps`] / [`CrudResource`] - current/desired state diffing adapted to [`Resource`]
//! - [`RetryResource`] / [`MetricsResource`] / [`wrap`] - uniform step decorators
//! - [`ResourceSet`] - the step list of one pipeline version
//! - [`VersionRouter`] - picks exactly one [`ResourceSet`] per object
//!
//! # Example
//!
//! ```rust,ignore
//! let set = ResourceSet::for_version("2.0.0", steps, PassContext::for_object);
//! let router = VersionRouter::new(vec![set])?;
//! match router.select(&cluster)?.reconcile(&cluster).await? {
//!     PassOutcome::Completed => {}
//!     PassOutcome::Canceled { step, reason } => debug!(step, reason, "Pass canceled"),
//! }
//! ```

mod context;
mod crud;
mod resource;
mod resource_set;
mod router;
mod wrappers;

#[cfg(test)]
pub(crate) mod testing;

pub use context::PassContext;
pub use crud::{CrudOps, CrudResource};
pub use resource::Resource;
pub use resource_set::{PassOutcome, ResourceSet};
pub use router::VersionRouter;
pub use wrappers::{wrap, MetricsResource, RetryPolicy, RetryResource};

use crate::crd::Condition;
use kube::ResourceExt;
use std::fmt::Debug;

/// A declarative object reconciled by a pipeline.
pub trait ManagedObject:
    kube::Resource<DynamicType = ()> + Clone + Debug + Send + Sync + 'static
{
    /// Pipeline version the object is pinned to.
    fn version_marker(&self) -> Option<&str>;

    /// `Ready` condition from the status, if any.
    fn ready_condition(&self) -> Option<&Condition>;

    /// Generation last reconciled successfully.
    fn observed_generation(&self) -> Option<i64>;

    /// Pipeline version that last reconciled the object, as recorded in its status.
    fn status_version(&self) -> Option<&str>;

    /// Whether the object is being deleted. Delete passes run `ensure_deleted`.
    fn is_deleting(&self) -> bool {
        self.meta().deletion_timestamp.is_some()
    }

    /// `namespace/name` identity for logs and lock owners.
    fn object_key(&self) -> String {
        format!(
            "{}/{}",
            self.namespace().unwrap_or_default(),
            self.name_any()
        )
    }
}
