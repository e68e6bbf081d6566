// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Test doubles shared by the pipeline unit tests.

use super::{PassContext, Resource};
use crate::crd::{Cluster, ClusterSpec};
use crate::errors::ReconcileError;
use crate::labels::OPERATOR_VERSION_LABEL;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Build a `Cluster` pinned to `version`.
pub fn cluster(name: &str, version: &str) -> Cluster {
    let mut cluster = Cluster::new(name, ClusterSpec::default());
    cluster.metadata.namespace = Some("default".to_string());
    cluster.metadata.labels = Some(BTreeMap::from([(
        OPERATOR_VERSION_LABEL.to_string(),
        version.to_string(),
    )]));
    cluster
}

/// Shared call log.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Step appending `<name>.<operation>` to a shared log on every call.
pub struct RecordingStep {
    name: String,
    log: CallLog,
    cancel: bool,
    failures: AtomicU32,
    failure: fn() -> ReconcileError,
}

impl RecordingStep {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            log: Arc::clone(log),
            cancel: false,
            failures: AtomicU32::new(0),
            failure: || ReconcileError::Conflict("test".to_string()),
        }
    }

    /// Cancel the pass after running.
    pub fn canceling(mut self) -> Self {
        self.cancel = true;
        self
    }

    /// Fail the first `times` calls with `failure`.
    pub fn failing(mut self, times: u32, failure: fn() -> ReconcileError) -> Self {
        self.failures = AtomicU32::new(times);
        self.failure = failure;
        self
    }

    pub fn boxed(self) -> Box<dyn Resource<Cluster>> {
        Box::new(self)
    }

    fn call(&self, operation: &str, ctx: &mut PassContext) -> Result<(), ReconcileError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}.{operation}", self.name));

        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err((self.failure)());
        }

        if self.cancel {
            ctx.cancel(format!("{} canceled", self.name));
        }
        Ok(())
    }
}

#[async_trait]
impl Resource<Cluster> for RecordingStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ensure_created(
        &self,
        _obj: &Cluster,
        ctx: &mut PassContext,
    ) -> Result<(), ReconcileError> {
        self.call("create", ctx)
    }

    async fn ensure_deleted(
        &self,
        _obj: &Cluster,
        ctx: &mut PassContext,
    ) -> Result<(), ReconcileError> {
        self.call("delete", ctx)
    }
}

/// Snapshot of a call log.
pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}
