// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry and metrics decorators applied uniformly to every pipeline step.

use super::{PassContext, Resource};
use crate::constants::DEFAULT_STEP_MAX_ATTEMPTS;
use crate::errors::ReconcileError;
use crate::metrics::{self, OUTCOME_CANCELED, OUTCOME_ERROR, OUTCOME_SUCCESS};
use crate::reconcilers::retry::step_backoff;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, warn};

const OPERATION_CREATE: &str = "create";
const OPERATION_DELETE: &str = "delete";

/// Bounds of the retry wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per step operation, first attempt included.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_STEP_MAX_ATTEMPTS,
        }
    }
}

/// Retries transient step errors with exponential backoff and jitter.
///
/// Non-transient errors and the last transient error are returned unchanged.
pub struct RetryResource<O> {
    inner: Box<dyn Resource<O>>,
    policy: RetryPolicy,
}

impl<O: Send + Sync> RetryResource<O> {
    /// Wrap `inner` with `policy`.
    #[must_use]
    pub fn new(inner: Box<dyn Resource<O>>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn run(
        &self,
        operation: &'static str,
        obj: &O,
        ctx: &mut PassContext,
    ) -> Result<(), ReconcileError> {
        let mut backoff = step_backoff();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let result = match operation {
                OPERATION_DELETE => self.inner.ensure_deleted(obj, ctx).await,
                _ => self.inner.ensure_created(obj, ctx).await,
            };

            match result {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts => {
                    let delay = backoff.next_backoff().unwrap_or(backoff.max_interval);
                    warn!(
                        step = self.inner.name(),
                        object = ctx.object(),
                        operation,
                        attempt,
                        retry_after = ?delay,
                        error = %e,
                        "Transient step error, will retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    debug!(
                        step = self.inner.name(),
                        object = ctx.object(),
                        operation,
                        attempt,
                        transient = e.is_transient(),
                        "Step failed"
                    );
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl<O: Send + Sync> Resource<O> for RetryResource<O> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn ensure_created(&self, obj: &O, ctx: &mut PassContext) -> Result<(), ReconcileError> {
        self.run(OPERATION_CREATE, obj, ctx).await
    }

    async fn ensure_deleted(&self, obj: &O, ctx: &mut PassContext) -> Result<(), ReconcileError> {
        self.run(OPERATION_DELETE, obj, ctx).await
    }
}

/// Records attempts, outcomes and duration of every call to the wrapped step.
pub struct MetricsResource<O> {
    inner: Box<dyn Resource<O>>,
}

impl<O: Send + Sync> MetricsResource<O> {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: Box<dyn Resource<O>>) -> Self {
        Self { inner }
    }

    fn observe(
        &self,
        operation: &str,
        started: Instant,
        ctx: &PassContext,
        result: &Result<(), ReconcileError>,
    ) {
        let outcome = match result {
            Ok(()) if ctx.is_canceled() => OUTCOME_CANCELED,
            Ok(()) => OUTCOME_SUCCESS,
            Err(e) if e.cancels_pass() => OUTCOME_CANCELED,
            Err(_) => OUTCOME_ERROR,
        };
        metrics::record_step_attempt(self.inner.name(), operation, outcome, started.elapsed());
    }
}

#[async_trait]
impl<O: Send + Sync> Resource<O> for MetricsResource<O> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn ensure_created(&self, obj: &O, ctx: &mut PassContext) -> Result<(), ReconcileError> {
        let started = Instant::now();
        let result = self.inner.ensure_created(obj, ctx).await;
        self.observe(OPERATION_CREATE, started, ctx, &result);
        result
    }

    async fn ensure_deleted(&self, obj: &O, ctx: &mut PassContext) -> Result<(), ReconcileError> {
        let started = Instant::now();
        let result = self.inner.ensure_deleted(obj, ctx).await;
        self.observe(OPERATION_DELETE, started, ctx, &result);
        result
    }
}

/// Apply the standard decorators to `step`.
///
/// Metrics sit inside the retry loop so every attempt is observed.
#[must_use]
pub fn wrap<O: Send + Sync + 'static>(
    step: Box<dyn Resource<O>>,
    policy: RetryPolicy,
) -> Box<dyn Resource<O>> {
    Box::new(RetryResource::new(
        Box::new(MetricsResource::new(step)),
        policy,
    ))
}

#[cfg(test)]
#[path = "wrappers_tests.rs"]
mod wrappers_tests;
