// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pure drain state transitions.
//!
//! ```text
//! Pending ──► Draining ──► Drained ──► Terminated
//!    │            │                        ▲
//!    └────────────┴── node or instance ────┘
//!                     disappeared
//! ```
//!
//! A node that vanishes before its drain finished is treated as drained: the
//! drain must never hold up the scaling group.

use crate::crd::DrainState;
use crate::status_reasons::{
    REASON_DRAIN_COMPLETED, REASON_DRAIN_STARTED, REASON_DRAIN_TIMED_OUT,
    REASON_INSTANCE_TERMINATED, REASON_NODE_DISAPPEARED,
};
use std::time::Duration;

/// What the drainer saw of the world during one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// The Kubernetes node still exists.
    pub node_exists: bool,
    /// The instance is still registered in the scaling group.
    pub instance_in_group: bool,
    /// The scaling group scheduled the instance for termination.
    pub instance_terminating: bool,
    /// Evictable pods still running on the node.
    pub pods_remaining: usize,
    /// Time spent in `Draining`, if draining.
    pub draining_for: Option<Duration>,
}

/// A state change and its CamelCase reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: DrainState,
    pub to: DrainState,
    pub reason: &'static str,
}

/// Next state of a drain in `state` given `obs`. `None` means stay.
#[must_use]
pub fn next_state(state: DrainState, obs: &Observation, timeout: Duration) -> Option<Transition> {
    let to = |to: DrainState, reason: &'static str| {
        Some(Transition {
            from: state,
            to,
            reason,
        })
    };

    match state {
        DrainState::Pending | DrainState::Draining if !obs.instance_in_group => {
            to(DrainState::Terminated, REASON_INSTANCE_TERMINATED)
        }
        DrainState::Pending | DrainState::Draining if !obs.node_exists => {
            to(DrainState::Terminated, REASON_NODE_DISAPPEARED)
        }
        DrainState::Pending if obs.instance_terminating => {
            to(DrainState::Draining, REASON_DRAIN_STARTED)
        }
        DrainState::Pending => None,
        DrainState::Draining if obs.pods_remaining == 0 => {
            to(DrainState::Drained, REASON_DRAIN_COMPLETED)
        }
        DrainState::Draining if obs.draining_for.is_some_and(|d| d >= timeout) => {
            to(DrainState::Drained, REASON_DRAIN_TIMED_OUT)
        }
        DrainState::Draining => None,
        DrainState::Drained if !obs.instance_in_group => {
            to(DrainState::Terminated, REASON_INSTANCE_TERMINATED)
        }
        DrainState::Drained | DrainState::Terminated => None,
    }
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod machine_tests;
