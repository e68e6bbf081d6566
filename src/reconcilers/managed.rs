// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of pipeline-managed kinds (`Cluster`, `NodePool`).
//!
//! One pass:
//!
//! 1. Route the object to the pipeline of its version marker
//! 2. Ensure the pipeline finalizer (not while deleting)
//! 3. Run the pipeline, in delete mode once the object is being deleted
//! 4. Release the finalizer after a completed delete pass
//!
//! Canceled passes set `Ready=False` with the cancel reason and requeue shortly.
//! Permanent errors set `Ready=False` with the error reason before being returned
//! to the controller's error policy.

use super::finalizers::{ensure_finalizer, has_finalizer, remove_finalizer};
use super::status::patch_status;
use crate::constants::{CANCELED_REQUEUE_DURATION_SECS, PERMANENT_ERROR_REQUEUE_DURATION_SECS};
use crate::context::Context;
use crate::crd::{Cluster, NodePool};
use crate::errors::ReconcileError;
use crate::labels::PIPELINE_FINALIZER;
use crate::metrics;
use crate::pipeline::{ManagedObject, PassOutcome, VersionRouter};
use crate::status_reasons::{CONDITION_STATUS_FALSE, REASON_WAITING_FOR_DEPENDENCY};
use crate::steps::ready_patch;
use kube::core::NamespaceResourceScope;
use kube::runtime::controller::Action;
use kube::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Requeue after a pass that did not fail.
#[must_use]
pub fn outcome_action(outcome: &PassOutcome, resync: Duration) -> Action {
    match outcome {
        PassOutcome::Completed => Action::requeue(resync),
        PassOutcome::Canceled { .. } => {
            Action::requeue(Duration::from_secs(CANCELED_REQUEUE_DURATION_SECS))
        }
    }
}

/// Reconcile a `Cluster`.
///
/// # Errors
///
/// Returns the pass error; the controller's error policy decides the requeue.
pub async fn reconcile_cluster(ctx: &Context, cluster: &Cluster) -> Result<Action, ReconcileError> {
    reconcile_managed(&ctx.client, &ctx.clusters, cluster, ctx.config.resync_interval()).await
}

/// Reconcile a `NodePool`.
///
/// # Errors
///
/// Returns the pass error; the controller's error policy decides the requeue.
pub async fn reconcile_node_pool(ctx: &Context, pool: &NodePool) -> Result<Action, ReconcileError> {
    reconcile_managed(&ctx.client, &ctx.node_pools, pool, ctx.config.resync_interval()).await
}

async fn reconcile_managed<O>(
    client: &Client,
    router: &VersionRouter<O>,
    obj: &O,
    resync: Duration,
) -> Result<Action, ReconcileError>
where
    O: ManagedObject + kube::Resource<Scope = NamespaceResourceScope> + DeserializeOwned,
{
    let kind = O::kind(&()).to_string();
    let key = obj.object_key();
    let deleting = obj.is_deleting();
    let start = Instant::now();

    if deleting && !has_finalizer(obj, PIPELINE_FINALIZER) {
        debug!(kind = %kind, object = %key, "Deleted object holds no finalizer, nothing to do");
        return Ok(Action::await_change());
    }

    let set = match router.select(obj) {
        Ok(set) => set,
        Err(ReconcileError::NotFound { .. }) => {
            return unrouted(client, obj, &kind, &key).await;
        }
        Err(e) => return Err(e),
    };

    if !deleting {
        ensure_finalizer(client, obj, PIPELINE_FINALIZER).await?;
    }

    debug!(kind = %kind, object = %key, version = set.version(), deleting, "Running pipeline");
    match set.reconcile(obj).await {
        Ok(PassOutcome::Completed) => {
            if deleting {
                remove_finalizer(client, obj, PIPELINE_FINALIZER).await?;
                info!(kind = %kind, object = %key, "Released deleted object");
            }
            metrics::record_reconciliation_success(&kind, start.elapsed());
            Ok(outcome_action(&PassOutcome::Completed, resync))
        }
        Ok(PassOutcome::Canceled { step, reason }) => {
            if !deleting {
                report_not_ready(client, obj, set.version(), REASON_WAITING_FOR_DEPENDENCY, &reason)
                    .await;
            }
            metrics::record_reconciliation_canceled(&kind, start.elapsed());
            metrics::record_reconciliation_requeue(&kind, REASON_WAITING_FOR_DEPENDENCY);
            Ok(outcome_action(&PassOutcome::Canceled { step, reason }, resync))
        }
        Err(e) => {
            metrics::record_reconciliation_error(&kind, start.elapsed());
            if e.is_permanent() && !deleting {
                report_not_ready(client, obj, set.version(), e.reason(), &e.to_string()).await;
            }
            Err(e)
        }
    }
}

/// No pipeline serves the object's version marker.
///
/// Such objects wait for a relabel or an operator upgrade. A deleted one is let go,
/// since no pipeline will ever clean it up.
async fn unrouted<O>(client: &Client, obj: &O, kind: &str, key: &str) -> Result<Action, ReconcileError>
where
    O: ManagedObject + kube::Resource<Scope = NamespaceResourceScope> + DeserializeOwned,
{
    let marker = obj.version_marker().unwrap_or("<none>");
    if obj.is_deleting() {
        warn!(kind, object = key, version = marker, "No pipeline for deleted object, releasing it");
        remove_finalizer(client, obj, PIPELINE_FINALIZER).await?;
        return Ok(Action::await_change());
    }

    warn!(kind, object = key, version = marker, "No pipeline serves this version");
    let err = ReconcileError::NotFound {
        kind: "pipeline".to_string(),
        name: marker.to_string(),
    };
    report_not_ready(client, obj, marker, err.reason(), &format!("No pipeline for version {marker}")).await;
    metrics::record_reconciliation_requeue(kind, err.reason());
    Ok(Action::requeue(Duration::from_secs(
        PERMANENT_ERROR_REQUEUE_DURATION_SECS,
    )))
}

/// Best-effort `Ready=False`; the pass result stands whether or not this lands.
async fn report_not_ready<O>(client: &Client, obj: &O, version: &str, reason: &str, message: &str)
where
    O: ManagedObject + kube::Resource<Scope = NamespaceResourceScope> + DeserializeOwned,
{
    let Some(patch) = ready_patch(obj, version, CONDITION_STATUS_FALSE, reason, message) else {
        return;
    };
    if let Err(e) = patch_status(client, obj, patch).await {
        warn!(object = %obj.object_key(), error = %e, "Failed to report Ready=False");
    }
}

#[cfg(test)]
#[path = "managed_tests.rs"]
mod managed_tests;
