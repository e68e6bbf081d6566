// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Current/desired state diffing for pipeline steps.
//!
//! A CRUD step describes what exists ([`CrudOps::current_state`]) and what should
//! exist ([`CrudOps::desired_state`], computed from the same observation), then derives three changes from the pair and
//! applies each non-empty one. [`CrudResource`] turns any [`CrudOps`] into a
//! [`Resource`].
//!
//! On a delete pass the desired state is [`Default::default`], so the delete change
//! covers everything the step currently owns.

use super::{PassContext, Resource};
use crate::errors::ReconcileError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::marker::PhantomData;
use tracing::debug;

/// State-diffing contract of a CRUD step.
#[async_trait]
pub trait CrudOps<O: Send + Sync>: Send + Sync {
    /// State representation. The default value means "nothing".
    type State: Debug + Default + Send + Sync;

    /// Stable step name.
    fn name(&self) -> &str;

    /// Observe what currently exists for `obj`.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ReconcileError`] when discovery fails.
    async fn current_state(
        &self,
        obj: &O,
        ctx: &mut PassContext,
    ) -> Result<Self::State, ReconcileError>;

    /// Compute what should exist for `obj`, given the `current` state observed
    /// earlier in the same pass.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ReconcileError`] when the desired state cannot be derived.
    async fn desired_state(
        &self,
        obj: &O,
        current: &Self::State,
        ctx: &mut PassContext,
    ) -> Result<Self::State, ReconcileError>;

    /// Part of `desired` missing from `current`. `None` when nothing to create.
    fn create_change(&self, current: &Self::State, desired: &Self::State) -> Option<Self::State>;

    /// Part of `current` that differs from `desired`. `None` when nothing to update.
    fn update_change(&self, _current: &Self::State, _desired: &Self::State) -> Option<Self::State> {
        None
    }

    /// Part of `current` no longer in `desired`. `None` when nothing to delete.
    fn delete_change(&self, current: &Self::State, desired: &Self::State) -> Option<Self::State>;

    /// Create `change`.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ReconcileError`] when the write fails.
    async fn apply_create(
        &self,
        obj: &O,
        ctx: &mut PassContext,
        change: Self::State,
    ) -> Result<(), ReconcileError>;

    /// Update to `change`.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ReconcileError`] when the write fails.
    async fn apply_update(
        &self,
        _obj: &O,
        _ctx: &mut PassContext,
        _change: Self::State,
    ) -> Result<(), ReconcileError> {
        Ok(())
    }

    /// Delete `change`.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ReconcileError`] when the delete fails.
    async fn apply_delete(
        &self,
        obj: &O,
        ctx: &mut PassContext,
        change: Self::State,
    ) -> Result<(), ReconcileError>;
}

/// Adapter running a [`CrudOps`] as a pipeline [`Resource`].
pub struct CrudResource<O, C> {
    ops: C,
    _object: PhantomData<fn(&O)>,
}

impl<O, C> CrudResource<O, C> {
    /// Wrap `ops`.
    pub fn new(ops: C) -> Self {
        Self {
            ops,
            _object: PhantomData,
        }
    }
}

#[async_trait]
impl<O, C> Resource<O> for CrudResource<O, C>
where
    O: Send + Sync,
    C: CrudOps<O>,
{
    fn name(&self) -> &str {
        self.ops.name()
    }

    async fn ensure_created(&self, obj: &O, ctx: &mut PassContext) -> Result<(), ReconcileError> {
        let current = self.ops.current_state(obj, ctx).await?;
        let desired = self.ops.desired_state(obj, &current, ctx).await?;
        if ctx.is_canceled() {
            return Ok(());
        }

        if let Some(change) = self.ops.create_change(&current, &desired) {
            debug!(step = self.ops.name(), object = ctx.object(), ?change, "Applying create");
            self.ops.apply_create(obj, ctx, change).await?;
            if ctx.is_canceled() {
                return Ok(());
            }
        }

        if let Some(change) = self.ops.update_change(&current, &desired) {
            debug!(step = self.ops.name(), object = ctx.object(), ?change, "Applying update");
            self.ops.apply_update(obj, ctx, change).await?;
            if ctx.is_canceled() {
                return Ok(());
            }
        }

        if let Some(change) = self.ops.delete_change(&current, &desired) {
            debug!(step = self.ops.name(), object = ctx.object(), ?change, "Applying delete");
            self.ops.apply_delete(obj, ctx, change).await?;
        }

        Ok(())
    }

    async fn ensure_deleted(&self, obj: &O, ctx: &mut PassContext) -> Result<(), ReconcileError> {
        let current = self.ops.current_state(obj, ctx).await?;
        if ctx.is_canceled() {
            return Ok(());
        }

        if let Some(change) = self
            .ops
            .delete_change(&current, &<C::State as Default>::default())
        {
            debug!(step = self.ops.name(), object = ctx.object(), ?change, "Applying delete");
            self.ops.apply_delete(obj, ctx, change).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "crud_tests.rs"]
mod crud_tests;
