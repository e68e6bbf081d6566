// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation controllers.
//!
//! Each reconciler is invoked by a `kube::runtime::Controller` with one object and
//! returns the [`Action`] telling the controller when to look at it again.
//!
//! # Available Reconcilers
//!
//! - [`reconcile_cluster`] - Runs the `Cluster` pipeline selected by version marker
//! - [`reconcile_node_pool`] - Runs the `NodePool` pipeline selected by version marker
//! - [`reconcile_node_drain`] - Drives one `NodeDrain` through the drain state machine
//!
//! Errors are handed to [`error_action`], which backs off longer on permanent
//! errors so a misconfigured object does not spin.
//!
//! # Example: Using a Reconciler
//!
//! ```rust,ignore
//! use clusterops::reconcilers::{error_action, reconcile_cluster};
//!
//! let action = match reconcile_cluster(&ctx, &cluster).await {
//!     Ok(action) => action,
//!     Err(e) => error_action(&e),
//! };
//! ```

pub mod finalizers;
pub mod managed;
pub mod nodedrain;
pub mod retry;
pub mod status;

pub use managed::{outcome_action, reconcile_cluster, reconcile_node_pool};
pub use nodedrain::{drain_action, drain_status_patch, reconcile_node_drain};

use crate::constants::{ERROR_REQUEUE_DURATION_SECS, PERMANENT_ERROR_REQUEUE_DURATION_SECS};
use crate::errors::ReconcileError;
use kube::runtime::controller::Action;
use std::time::Duration;

/// Requeue policy for a failed reconciliation.
///
/// Permanent errors need a human (or a spec change, which triggers a new pass
/// anyway), so they are retried slowly. Everything else comes back quickly.
#[must_use]
pub fn error_action(err: &ReconcileError) -> Action {
    if err.is_permanent() {
        Action::requeue(Duration::from_secs(PERMANENT_ERROR_REQUEUE_DURATION_SECS))
    } else {
        Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
    }
}

#[cfg(test)]
mod mod_tests;
