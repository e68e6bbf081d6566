// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Concrete pipeline steps and the supported pipeline versions.
//!
//! Every supported version runs the same generic pipeline; versions differ only in
//! their [`VersionProfile`]. Steps, in order:
//!
//! | Step                 | `Cluster` | `NodePool` |
//! |----------------------|-----------|------------|
//! | `cluster-dependency` |           | yes        |
//! | `ipam`               | yes       | yes        |
//! | `drain-records`      |           | per profile |
//! | `status`             | yes       | yes        |
//!
//! Every step is wrapped in the retry and metrics decorators.

mod cluster_dependency;
mod drain_records;
mod status;

pub use cluster_dependency::{ClusterDependency, ClusterLookup, KubeClusterLookup};
pub use drain_records::{
    build_record, desired_records, record_name, DrainEntry, DrainRecordMap, DrainRecordStore,
    DrainRecords, KubeDrainRecordStore,
};
pub use status::{ready_patch, KubeStatusWriter, StatusResource, StatusWriter};

use crate::constants::{PIPELINE_VERSION_V1, PIPELINE_VERSION_V2};
use crate::crd::{Cluster, NodePool};
use crate::errors::ReconcileError;
use crate::ipam::{
    Checker, Collector, IpamResource, IpamSettings, KubeChecker, KubeCollector, KubePersister,
    Persister,
};
use crate::lock::Lock;
use crate::pipeline::{
    wrap, CrudResource, PassContext, Resource, ResourceSet, RetryPolicy, VersionRouter,
};
use kube::Client;
use std::sync::Arc;

/// Per-version configuration of the generic pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionProfile {
    /// Version marker value selecting this pipeline
    pub version: &'static str,
    /// Whether node pools get `NodeDrain` records for terminating instances
    pub manage_drain_records: bool,
    /// Prefix length for cluster subnets, overriding the configured default
    pub cluster_mask_bits: Option<u8>,
    /// Prefix length for node pool subnets, overriding the configured default
    pub node_pool_mask_bits: Option<u8>,
}

/// Every pipeline version this build knows how to run.
pub const PROFILES: &[VersionProfile] = &[
    VersionProfile {
        version: PIPELINE_VERSION_V1,
        manage_drain_records: false,
        cluster_mask_bits: None,
        node_pool_mask_bits: Some(20),
    },
    VersionProfile {
        version: PIPELINE_VERSION_V2,
        manage_drain_records: true,
        cluster_mask_bits: None,
        node_pool_mask_bits: None,
    },
];

/// Profile of `version`.
///
/// # Errors
///
/// Returns [`ReconcileError::InvalidConfig`] when this build has no such version.
pub fn profile(version: &str) -> Result<&'static VersionProfile, ReconcileError> {
    PROFILES
        .iter()
        .find(|p| p.version == version)
        .ok_or_else(|| {
            ReconcileError::InvalidConfig(format!(
                "unsupported pipeline version '{version}' (known: {})",
                PROFILES
                    .iter()
                    .map(|p| p.version)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}

/// Collaborators shared by the steps of every pipeline version.
#[derive(Clone)]
pub struct StepDeps {
    pub lock: Arc<dyn Lock>,
    pub collector: Arc<dyn Collector>,
    pub cluster_checker: Arc<dyn Checker<Cluster>>,
    pub node_pool_checker: Arc<dyn Checker<NodePool>>,
    pub cluster_persister: Arc<dyn Persister<Cluster>>,
    pub node_pool_persister: Arc<dyn Persister<NodePool>>,
    pub cluster_status: Arc<dyn StatusWriter<Cluster>>,
    pub node_pool_status: Arc<dyn StatusWriter<NodePool>>,
    pub cluster_lookup: Arc<dyn ClusterLookup>,
    pub drain_records: Arc<dyn DrainRecordStore>,
    /// Cluster allocation settings before profile overrides
    pub cluster_ipam: IpamSettings,
    /// Node pool allocation settings before profile overrides
    pub node_pool_ipam: IpamSettings,
    pub retry: RetryPolicy,
}

impl StepDeps {
    /// Collaborators talking to the Kubernetes API.
    #[must_use]
    pub fn kube(
        client: &Client,
        lock: Arc<dyn Lock>,
        cluster_ipam: IpamSettings,
        node_pool_ipam: IpamSettings,
        retry: RetryPolicy,
    ) -> Self {
        let checker = Arc::new(KubeChecker::new(client.clone()));
        let persister = Arc::new(KubePersister::new(client.clone()));
        Self {
            lock,
            collector: Arc::new(KubeCollector::new(client.clone())),
            cluster_checker: checker.clone(),
            node_pool_checker: checker,
            cluster_persister: persister.clone(),
            node_pool_persister: persister,
            cluster_status: Arc::new(KubeStatusWriter::<Cluster>::new(client.clone())),
            node_pool_status: Arc::new(KubeStatusWriter::<NodePool>::new(client.clone())),
            cluster_lookup: Arc::new(KubeClusterLookup::new(client.clone())),
            drain_records: Arc::new(KubeDrainRecordStore::new(client.clone())),
            cluster_ipam,
            node_pool_ipam,
            retry,
        }
    }
}

fn with_mask(settings: IpamSettings, mask_bits: Option<u8>) -> IpamSettings {
    IpamSettings {
        default_mask_bits: mask_bits.unwrap_or(settings.default_mask_bits),
        ..settings
    }
}

/// `Cluster` pipeline of `profile`.
#[must_use]
pub fn cluster_resource_set(profile: &VersionProfile, deps: &StepDeps) -> ResourceSet<Cluster> {
    let ipam = IpamResource::new(
        deps.lock.clone(),
        deps.cluster_checker.clone(),
        deps.collector.clone(),
        deps.cluster_persister.clone(),
        with_mask(deps.cluster_ipam, profile.cluster_mask_bits),
    );

    let steps: Vec<Box<dyn Resource<Cluster>>> = vec![
        wrap(Box::new(ipam), deps.retry),
        wrap(
            Box::new(StatusResource::new(deps.cluster_status.clone())),
            deps.retry,
        ),
    ];
    ResourceSet::for_version(profile.version, steps, PassContext::for_object)
}

/// `NodePool` pipeline of `profile`.
#[must_use]
pub fn node_pool_resource_set(
    profile: &VersionProfile,
    deps: &StepDeps,
) -> ResourceSet<NodePool> {
    let ipam = IpamResource::new(
        deps.lock.clone(),
        deps.node_pool_checker.clone(),
        deps.collector.clone(),
        deps.node_pool_persister.clone(),
        with_mask(deps.node_pool_ipam, profile.node_pool_mask_bits),
    );

    let mut steps: Vec<Box<dyn Resource<NodePool>>> = vec![
        wrap(
            Box::new(ClusterDependency::new(deps.cluster_lookup.clone())),
            deps.retry,
        ),
        wrap(Box::new(ipam), deps.retry),
    ];
    if profile.manage_drain_records {
        steps.push(wrap(
            Box::new(CrudResource::new(DrainRecords::new(
                deps.drain_records.clone(),
            ))),
            deps.retry,
        ));
    }
    steps.push(wrap(
        Box::new(StatusResource::new(deps.node_pool_status.clone())),
        deps.retry,
    ));
    ResourceSet::for_version(profile.version, steps, PassContext::for_object)
}

/// Routers for both object kinds over `versions`.
///
/// # Errors
///
/// Returns [`ReconcileError::InvalidConfig`] for unknown, duplicate or missing versions.
pub fn build_routers(
    versions: &[String],
    deps: &StepDeps,
) -> Result<(VersionRouter<Cluster>, VersionRouter<NodePool>), ReconcileError> {
    let profiles = versions
        .iter()
        .map(|v| profile(v))
        .collect::<Result<Vec<_>, _>>()?;

    let clusters = VersionRouter::new(
        profiles
            .iter()
            .map(|p| cluster_resource_set(p, deps))
            .collect(),
    )?;
    let node_pools = VersionRouter::new(
        profiles
            .iter()
            .map(|p| node_pool_resource_set(p, deps))
            .collect(),
    )?;
    Ok((clusters, node_pools))
}
