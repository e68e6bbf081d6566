// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pipeline step giving an object its subnet.

use super::{
    allocate, find_overlap, parse_subnet, AllocationTarget, Check, Checker, Collector, Persister,
    Range,
};
use crate::constants::{COMPONENT_NAME, LOCK_NAME_PREFIX};
use crate::errors::ReconcileError;
use crate::lock::{acquire_with_backoff, Lock};
use crate::metrics;
use crate::pipeline::{PassContext, Resource};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const STEP_NAME: &str = "ipam";

/// Lock name serializing allocations in `pool`.
///
/// Lease names must be DNS labels, so the CIDR punctuation is replaced.
#[must_use]
pub fn lock_name(pool: &Range) -> String {
    format!(
        "{LOCK_NAME_PREFIX}-{}",
        pool.trunc().to_string().replace(['.', '/'], "-")
    )
}

/// Pool and lock parameters of the allocation step.
#[derive(Debug, Clone, Copy)]
pub struct IpamSettings {
    /// Root range all subnets are carved from
    pub pool: Range,
    /// Prefix length used when the object does not request one
    pub default_mask_bits: u8,
    /// Lease time-to-live of the allocation lock
    pub lock_ttl: Duration,
    /// Maximum time spent waiting for the allocation lock
    pub lock_timeout: Duration,
    /// Allocation cycles attempted when the status write conflicts
    pub max_attempts: u32,
}

/// Allocates a subnet for objects that have none.
///
/// The create pass is a no-op once the object holds a subnet, so the step is
/// idempotent. The delete pass does nothing: a deleted object's subnet simply stops
/// showing up in the collector.
pub struct IpamResource<O> {
    lock: Arc<dyn Lock>,
    checker: Arc<dyn Checker<O>>,
    collector: Arc<dyn Collector>,
    persister: Arc<dyn Persister<O>>,
    settings: IpamSettings,
    lock_name: String,
}

impl<O: AllocationTarget> IpamResource<O> {
    #[must_use]
    pub fn new(
        lock: Arc<dyn Lock>,
        checker: Arc<dyn Checker<O>>,
        collector: Arc<dyn Collector>,
        persister: Arc<dyn Persister<O>>,
        settings: IpamSettings,
    ) -> Self {
        Self {
            lock,
            checker,
            collector,
            persister,
            lock_name: lock_name(&settings.pool),
            settings,
        }
    }

    fn owner(ctx: &PassContext) -> String {
        format!("{COMPONENT_NAME}@{}/{}", ctx.version(), ctx.object())
    }

    /// Allocation cycles, run while holding the lock.
    async fn allocate_locked(
        &self,
        obj: &O,
        ctx: &mut PassContext,
        owner: &str,
    ) -> Result<(), ReconcileError> {
        let kind = O::kind(&());
        let mask_bits = obj
            .mask_bits_override()
            .unwrap_or(self.settings.default_mask_bits);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            // Time passed waiting for the lock or since the conflicting write.
            let live = match self.checker.check(obj).await? {
                Check::Allocated(subnet) => {
                    debug!(object = ctx.object(), %subnet, "Subnet allocated concurrently");
                    ctx.subnet = Some(parse_subnet(ctx.object(), &subnet)?);
                    return Ok(());
                }
                Check::Unallocated(live) => live,
            };

            let allocated = self.collector.collect_allocated().await?;
            if let Some((a, b)) = find_overlap(&allocated) {
                return Err(ReconcileError::ExecutionFailed(format!(
                    "pool {} holds overlapping subnets {a} and {b}",
                    self.settings.pool
                )));
            }

            let range = match allocate(self.settings.pool, &allocated, mask_bits) {
                Ok(range) => range,
                Err(e) => {
                    metrics::record_allocation(&kind, e.reason());
                    return Err(e);
                }
            };

            // The lease may have lapsed during a slow list; never write without it.
            self.lock
                .renew(&self.lock_name, owner, self.settings.lock_ttl)
                .await?;

            match self.persister.persist(&live, range).await {
                Ok(()) => {
                    metrics::record_allocation(&kind, "allocated");
                    info!(
                        object = ctx.object(),
                        subnet = %range,
                        pool = %self.settings.pool,
                        attempt,
                        "Allocated subnet"
                    );
                    ctx.subnet = Some(range);
                    return Ok(());
                }
                Err(ReconcileError::Conflict(what)) if attempt < self.settings.max_attempts => {
                    warn!(
                        object = ctx.object(),
                        attempt,
                        conflict = %what,
                        "Subnet write conflicted, restarting allocation cycle"
                    );
                }
                Err(e) => {
                    metrics::record_allocation(&kind, e.reason());
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl<O: AllocationTarget> Resource<O> for IpamResource<O> {
    fn name(&self) -> &str {
        STEP_NAME
    }

    async fn ensure_created(&self, obj: &O, ctx: &mut PassContext) -> Result<(), ReconcileError> {
        if let Check::Allocated(subnet) = self.checker.check(obj).await? {
            ctx.subnet = Some(parse_subnet(ctx.object(), &subnet)?);
            return Ok(());
        }

        let owner = Self::owner(ctx);
        acquire_with_backoff(
            self.lock.as_ref(),
            &self.lock_name,
            &owner,
            self.settings.lock_ttl,
            self.settings.lock_timeout,
        )
        .await?;

        let result = self.allocate_locked(obj, ctx, &owner).await;

        if let Err(e) = self.lock.release(&self.lock_name, &owner).await {
            // The lease expires on its own; the allocation outcome matters more.
            warn!(lock = %self.lock_name, owner = %owner, error = %e, "Failed to release lock");
        }

        result
    }

    async fn ensure_deleted(&self, _obj: &O, _ctx: &mut PassContext) -> Result<(), ReconcileError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod resource_tests;
