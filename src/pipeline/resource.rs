// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The step contract.

use super::PassContext;
use crate::errors::ReconcileError;
use async_trait::async_trait;

/// One idempotent step of a pipeline.
///
/// Both operations must converge: running them repeatedly has no effect beyond
/// moving the world toward the desired state. A step ends the pass early by calling
/// [`PassContext::cancel`] and returning `Ok(())`.
#[async_trait]
pub trait Resource<O: Send + Sync>: Send + Sync {
    /// Stable step name, used for logs and metric labels.
    fn name(&self) -> &str;

    /// Converge `obj` toward its desired state.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ReconcileError`]; transient kinds may be retried by
    /// the retry wrapper.
    async fn ensure_created(&self, obj: &O, ctx: &mut PassContext) -> Result<(), ReconcileError>;

    /// Clean up what this step owns for an object being deleted.
    ///
    /// # Errors
    ///
    /// Same classification as [`Resource::ensure_created`].
    async fn ensure_deleted(&self, obj: &O, ctx: &mut PassContext) -> Result<(), ReconcileError>;
}
