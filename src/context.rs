// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all controllers.
//!
//! Every controller receives an `Arc<Context>` holding:
//! - the Kubernetes client
//! - the validated configuration
//! - one [`VersionRouter`] per pipeline-managed kind
//! - the [`Drainer`] driving `NodeDrain` records
//!
//! Routers and steps are immutable once built, so one context serves every
//! concurrent reconciliation.

use crate::config::{Config, LockBackend};
use crate::crd::{Cluster, NodePool};
use crate::drainer::{Drainer, KubeNodeOperations, KubeScalingGroups};
use crate::errors::ReconcileError;
use crate::lock::{LeaseLock, Lock, MemoryLock};
use crate::pipeline::VersionRouter;
use crate::steps::{build_routers, StepDeps};
use kube::Client;
use std::sync::Arc;
use tracing::info;

/// Shared context passed to all controllers.
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Operator configuration
    pub config: Config,

    /// Pipelines reconciling `Cluster` objects
    pub clusters: VersionRouter<Cluster>,

    /// Pipelines reconciling `NodePool` objects
    pub node_pools: VersionRouter<NodePool>,

    /// Drain state machine driver
    pub drainer: Drainer,
}

impl Context {
    /// Build the context from a validated `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidConfig`] when the configured pipeline
    /// versions cannot be assembled.
    pub fn new(client: Client, config: Config) -> Result<Self, ReconcileError> {
        let lock: Arc<dyn Lock> = match config.lock_backend {
            LockBackend::Lease => Arc::new(LeaseLock::new(client.clone(), &config.lock_namespace)),
            LockBackend::Memory => Arc::new(MemoryLock::new()),
        };

        let deps = StepDeps::kube(
            &client,
            lock,
            config.cluster_ipam(),
            config.node_pool_ipam(),
            config.retry_policy(),
        );
        let (clusters, node_pools) = build_routers(&config.supported_versions, &deps)?;

        let drainer = Drainer::new(
            Arc::new(KubeScalingGroups::new(client.clone())),
            Arc::new(KubeNodeOperations::new(client.clone())),
            config.drain_timeout(),
        );

        info!(
            versions = ?clusters.versions(),
            lock_backend = ?config.lock_backend,
            pool = %config.pool_cidr,
            "Pipelines assembled"
        );

        Ok(Self {
            client,
            config,
            clusters,
            node_pools,
            drainer,
        })
    }
}
