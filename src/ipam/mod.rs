// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Distributed subnet allocation.
//!
//! Every `Cluster` and `NodePool` receives a subnet carved from one shared IPv4
//! pool. Allocations across all objects in the pool are pairwise disjoint; the
//! allocated range is persisted in the object's `status.subnet` and never changes
//! afterwards.
//!
//! The allocator is split into capabilities so each can be replaced in tests:
//!
//! - [`Checker`] - does the object still need a subnet? Reads the live object
//! - [`Collector`] - every subnet currently held in the pool
//! - [`allocate`] - pure first-fit carving
//! - [`Persister`] - compare-and-swap write of the chosen subnet
//! - [`IpamResource`] - the pipeline step serializing all of the above under a
//!   [`crate::lock::Lock`]
//!
//! # Allocation cycle
//!
//! ```text
//! check ─► lock ─► re-check ─► collect ─► allocate ─► persist ─► unlock
//!                     ▲                                  │
//!                     └────────── Conflict ──────────────┘
//! ```

mod allocate;
mod checker;
mod collector;
mod persister;
mod resource;

pub use allocate::{allocate, find_overlap, overlaps};
pub use checker::{Check, Checker, KubeChecker};
pub use collector::{Collector, KubeCollector};
pub use persister::{KubePersister, Persister};
pub use resource::{lock_name, IpamResource, IpamSettings};

use crate::errors::ReconcileError;
use crate::pipeline::ManagedObject;
use ipnet::Ipv4Net;

/// A contiguous IPv4 block.
pub type Range = Ipv4Net;

/// Object that holds a subnet from the shared pool.
pub trait AllocationTarget: ManagedObject {
    /// Persisted subnet, `None` when unallocated.
    fn subnet(&self) -> Option<&str>;

    /// Prefix length requested by the object itself.
    fn mask_bits_override(&self) -> Option<u8>;
}

/// Parse a persisted subnet.
///
/// # Errors
///
/// Returns [`ReconcileError::ExecutionFailed`] when the stored value is not a CIDR;
/// such a value could hide an allocation from the collector.
pub fn parse_subnet(owner: &str, value: &str) -> Result<Range, ReconcileError> {
    value.parse::<Ipv4Net>().map_err(|e| {
        ReconcileError::ExecutionFailed(format!(
            "{owner} holds unparsable subnet '{value}': {e}"
        ))
    })
}
