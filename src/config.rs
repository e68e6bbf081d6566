// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration.
//!
//! Every option can be given on the command line or through its `CLUSTEROPS_*`
//! environment variable. [`Config::validate`] rejects inconsistent settings at
//! startup, before any controller runs.

use crate::constants::{
    DEFAULT_CLUSTER_MASK_BITS, DEFAULT_CONTROLLER_CONCURRENCY, DEFAULT_DRAIN_TIMEOUT_SECS,
    DEFAULT_LOCK_NAMESPACE, DEFAULT_LOCK_TIMEOUT_SECS, DEFAULT_LOCK_TTL_SECS,
    DEFAULT_METRICS_BIND_ADDRESS, DEFAULT_NODE_POOL_MASK_BITS, DEFAULT_POOL_CIDR,
    DEFAULT_RESYNC_INTERVAL_SECS, DEFAULT_STEP_MAX_ATTEMPTS, MAX_ALLOCATION_ATTEMPTS,
    PIPELINE_VERSION_V1, PIPELINE_VERSION_V2,
};
use crate::errors::ReconcileError;
use crate::ipam::IpamSettings;
use crate::pipeline::RetryPolicy;
use crate::steps::profile;
use clap::{Parser, ValueEnum};
use ipnet::Ipv4Net;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

/// Where the allocation lock lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LockBackend {
    /// `coordination.k8s.io/v1` `Lease` objects, shared by all replicas
    Lease,
    /// In-process only; a single replica must be running
    Memory,
}

/// clusterops - cluster lifecycle operator for Kubernetes
#[derive(Parser, Debug, Clone)]
#[command(name = "clusterops", version, about, long_about = None)]
pub struct Config {
    /// Address pool every cluster and node pool subnet is carved from
    #[arg(long, env = "CLUSTEROPS_POOL_CIDR", default_value = DEFAULT_POOL_CIDR)]
    pub pool_cidr: Ipv4Net,

    /// Prefix length of cluster subnets
    #[arg(long, env = "CLUSTEROPS_CLUSTER_MASK_BITS", default_value_t = DEFAULT_CLUSTER_MASK_BITS)]
    pub cluster_mask_bits: u8,

    /// Prefix length of node pool subnets
    #[arg(long, env = "CLUSTEROPS_NODE_POOL_MASK_BITS", default_value_t = DEFAULT_NODE_POOL_MASK_BITS)]
    pub node_pool_mask_bits: u8,

    /// Allocation cycles attempted when the subnet write conflicts
    #[arg(long, env = "CLUSTEROPS_MAX_ALLOCATION_ATTEMPTS", default_value_t = MAX_ALLOCATION_ATTEMPTS)]
    pub max_allocation_attempts: u32,

    /// Lock implementation
    #[arg(long, env = "CLUSTEROPS_LOCK_BACKEND", value_enum, default_value_t = LockBackend::Lease)]
    pub lock_backend: LockBackend,

    /// Namespace holding the allocation `Lease`
    #[arg(long, env = "CLUSTEROPS_LOCK_NAMESPACE", default_value = DEFAULT_LOCK_NAMESPACE)]
    pub lock_namespace: String,

    /// Lease time-to-live in seconds
    #[arg(long, env = "CLUSTEROPS_LOCK_TTL_SECS", default_value_t = DEFAULT_LOCK_TTL_SECS)]
    pub lock_ttl_secs: u64,

    /// Maximum wait for the allocation lock in seconds
    #[arg(long, env = "CLUSTEROPS_LOCK_TIMEOUT_SECS", default_value_t = DEFAULT_LOCK_TIMEOUT_SECS)]
    pub lock_timeout_secs: u64,

    /// Version of this operator build
    #[arg(long, env = "CLUSTEROPS_OPERATOR_VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    pub operator_version: String,

    /// Pipeline versions served by this operator, in evaluation order
    #[arg(
        long,
        env = "CLUSTEROPS_SUPPORTED_VERSIONS",
        value_delimiter = ',',
        default_values = [PIPELINE_VERSION_V1, PIPELINE_VERSION_V2]
    )]
    pub supported_versions: Vec<String>,

    /// Attempts per pipeline step operation on transient errors
    #[arg(long, env = "CLUSTEROPS_STEP_MAX_ATTEMPTS", default_value_t = DEFAULT_STEP_MAX_ATTEMPTS)]
    pub step_max_attempts: u32,

    /// Requeue interval of healthy objects in seconds
    #[arg(long, env = "CLUSTEROPS_RESYNC_INTERVAL_SECS", default_value_t = DEFAULT_RESYNC_INTERVAL_SECS)]
    pub resync_interval_secs: u64,

    /// Time after which a drain is considered done even with pods left, in seconds
    #[arg(long, env = "CLUSTEROPS_DRAIN_TIMEOUT_SECS", default_value_t = DEFAULT_DRAIN_TIMEOUT_SECS)]
    pub drain_timeout_secs: u64,

    /// Objects reconciled in parallel per controller
    #[arg(long, env = "CLUSTEROPS_CONCURRENCY", default_value_t = DEFAULT_CONTROLLER_CONCURRENCY)]
    pub concurrency: u16,

    /// Listen address of the metrics and probe server
    #[arg(long, env = "CLUSTEROPS_METRICS_BIND_ADDRESS", default_value = DEFAULT_METRICS_BIND_ADDRESS)]
    pub metrics_bind_address: SocketAddr,
}

impl Config {
    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidConfig`] naming the first offending option.
    pub fn validate(&self) -> Result<(), ReconcileError> {
        let pool = self.pool_cidr.trunc();
        for (option, bits) in [
            ("cluster-mask-bits", self.cluster_mask_bits),
            ("node-pool-mask-bits", self.node_pool_mask_bits),
        ] {
            if bits < pool.prefix_len() || bits > 32 {
                return Err(invalid(format!(
                    "{option} {bits} must be between {} and 32 for pool {pool}",
                    pool.prefix_len()
                )));
            }
        }

        if self.lock_ttl_secs == 0 {
            return Err(invalid("lock-ttl-secs must be positive".to_string()));
        }
        if self.lock_timeout_secs == 0 {
            return Err(invalid("lock-timeout-secs must be positive".to_string()));
        }
        if self.max_allocation_attempts == 0 {
            return Err(invalid("max-allocation-attempts must be positive".to_string()));
        }
        if self.step_max_attempts == 0 {
            return Err(invalid("step-max-attempts must be positive".to_string()));
        }
        if self.concurrency == 0 {
            return Err(invalid("concurrency must be positive".to_string()));
        }
        if self.resync_interval_secs == 0 {
            return Err(invalid("resync-interval-secs must be positive".to_string()));
        }

        if self.supported_versions.is_empty() {
            return Err(invalid("supported-versions must not be empty".to_string()));
        }
        let mut seen = HashSet::new();
        for version in &self.supported_versions {
            let profile = profile(version)?;
            if !seen.insert(version) {
                return Err(invalid(format!("supported-versions lists {version} twice")));
            }
            for (kind, bits) in [
                ("cluster", profile.cluster_mask_bits),
                ("node pool", profile.node_pool_mask_bits),
            ] {
                if let Some(bits) = bits.filter(|&b| b < pool.prefix_len() || b > 32) {
                    return Err(invalid(format!(
                        "pipeline {version} uses /{bits} {kind} subnets, which do not fit pool {pool}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Allocation settings for cluster subnets.
    #[must_use]
    pub fn cluster_ipam(&self) -> IpamSettings {
        self.ipam(self.cluster_mask_bits)
    }

    /// Allocation settings for node pool subnets.
    #[must_use]
    pub fn node_pool_ipam(&self) -> IpamSettings {
        self.ipam(self.node_pool_mask_bits)
    }

    fn ipam(&self, mask_bits: u8) -> IpamSettings {
        IpamSettings {
            pool: self.pool_cidr.trunc(),
            default_mask_bits: mask_bits,
            lock_ttl: Duration::from_secs(self.lock_ttl_secs),
            lock_timeout: Duration::from_secs(self.lock_timeout_secs),
            max_attempts: self.max_allocation_attempts,
        }
    }

    /// Retry policy of pipeline steps.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.step_max_attempts,
        }
    }

    #[must_use]
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

fn invalid(message: String) -> ReconcileError {
    ReconcileError::InvalidConfig(message)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
