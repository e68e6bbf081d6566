// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `NodeDrain` reconciliation.
//!
//! Each pass polls the [`crate::drainer::Drainer`], persists the resulting
//! transition and schedules the next poll. The drain finalizer is held from the
//! moment the node starts draining until the record reaches `Terminated`, so a
//! record deleted along with its node pool still sees its drain through.

use super::finalizers::{ensure_finalizer, remove_finalizer};
use super::status::{patch_status, update_condition_in_memory};
use crate::constants::{DRAIN_IDLE_POLL_INTERVAL_SECS, DRAIN_POLL_INTERVAL_SECS};
use crate::context::Context;
use crate::crd::{DrainState, NodeDrain};
use crate::drainer::Transition;
use crate::errors::ReconcileError;
use crate::labels::DRAIN_FINALIZER;
use crate::metrics;
use crate::status_reasons::{CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, CONDITION_TYPE_READY};
use k8s_openapi::chrono::{DateTime, Utc};
use kube::api::DeleteParams;
use kube::runtime::controller::Action;
use kube::{Api, ResourceExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

const RESOURCE_TYPE: &str = "NodeDrain";

/// Status merge patch recording `transition` at `now`.
#[must_use]
pub fn drain_status_patch(drain: &NodeDrain, transition: &Transition, now: DateTime<Utc>) -> Value {
    let status = drain.status.clone().unwrap_or_default();
    let mut conditions = status.conditions;
    let ready = if matches!(transition.to, DrainState::Drained | DrainState::Terminated) {
        CONDITION_STATUS_TRUE
    } else {
        CONDITION_STATUS_FALSE
    };
    update_condition_in_memory(
        &mut conditions,
        CONDITION_TYPE_READY,
        ready,
        transition.reason,
        &format!("{} -> {}", transition.from, transition.to),
    );

    let draining_since = if transition.to == DrainState::Draining {
        Some(now.to_rfc3339())
    } else {
        status.draining_since
    };

    json!({
        "state": transition.to,
        "conditions": conditions,
        "drainingSince": draining_since,
        "lastTransitionTime": now.to_rfc3339(),
    })
}

/// When to poll a drain in `state` again.
#[must_use]
pub fn drain_action(state: DrainState) -> Action {
    match state {
        DrainState::Draining => Action::requeue(Duration::from_secs(DRAIN_POLL_INTERVAL_SECS)),
        DrainState::Pending | DrainState::Drained => {
            Action::requeue(Duration::from_secs(DRAIN_IDLE_POLL_INTERVAL_SECS))
        }
        DrainState::Terminated => Action::await_change(),
    }
}

/// Reconcile a `NodeDrain`.
///
/// # Errors
///
/// Returns an error when the drainer cannot observe the node or scaling group, or
/// the status or finalizer cannot be written.
pub async fn reconcile_node_drain(ctx: &Context, drain: &NodeDrain) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let before = drain.state();
    let name = drain.name_any();

    let result = drive(ctx, drain, before).await;
    match &result {
        Ok(_) => metrics::record_reconciliation_success(RESOURCE_TYPE, start.elapsed()),
        Err(_) => metrics::record_reconciliation_error(RESOURCE_TYPE, start.elapsed()),
    }
    debug!(drain = %name, state = %before, "Drain pass finished");
    result
}

async fn drive(ctx: &Context, drain: &NodeDrain, before: DrainState) -> Result<Action, ReconcileError> {
    let now = Utc::now();
    let poll = ctx.drainer.poll(drain, now).await?;
    let state = poll.state(before);

    if let Some(transition) = poll.transition {
        if transition.to == DrainState::Draining {
            ensure_finalizer(&ctx.client, drain, DRAIN_FINALIZER).await?;
        }
        patch_status(&ctx.client, drain, drain_status_patch(drain, &transition, now)).await?;
        metrics::record_drain_transition(&transition.from.to_string(), &transition.to.to_string());
        info!(
            drain = %drain.name_any(),
            node = %drain.spec.node_name,
            from = %transition.from,
            to = %transition.to,
            reason = transition.reason,
            "Drain state changed"
        );
    }

    if state == DrainState::Terminated {
        remove_finalizer(&ctx.client, drain, DRAIN_FINALIZER).await?;
        if !poll.observation.instance_in_group {
            delete_record(ctx, drain).await?;
            return Ok(Action::await_change());
        }
        // Instance still listed as terminated; check again later.
        return Ok(Action::requeue(Duration::from_secs(
            DRAIN_IDLE_POLL_INTERVAL_SECS,
        )));
    }

    Ok(drain_action(state))
}

async fn delete_record(ctx: &Context, drain: &NodeDrain) -> Result<(), ReconcileError> {
    if drain.metadata.deletion_timestamp.is_some() {
        return Ok(());
    }
    let api: Api<NodeDrain> =
        Api::namespaced(ctx.client.clone(), &drain.namespace().unwrap_or_default());
    match api.delete(&drain.name_any(), &DeleteParams::default()).await {
        Ok(_) => {
            info!(drain = %drain.name_any(), "Deleted finished drain record");
            Ok(())
        }
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "nodedrain_tests.rs"]
mod nodedrain_tests;
