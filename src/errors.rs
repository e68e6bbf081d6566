// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error taxonomy for pipeline steps, the subnet allocator and the drainer.
//!
//! Every step classifies its own failures into a [`ReconcileError`]. The retry
//! wrapper only retries kinds for which [`ReconcileError::is_transient`] is `true`;
//! everything else aborts the pass and is handed to the controller's error policy.
//!
//! Cancellation of a pass is not an error and has no variant here. See
//! [`crate::pipeline::PassContext::cancel`]. A step failing with `NotFound` or
//! `NotYetAvailable` cancels the pass instead of failing it
//! ([`ReconcileError::cancels_pass`]).

use crate::status_reasons::{
    REASON_CONFLICT, REASON_EXECUTION_FAILED, REASON_INVALID_CONFIG, REASON_KUBERNETES_API_ERROR,
    REASON_LOCK_HELD, REASON_LOCK_TIMEOUT, REASON_NOT_FOUND, REASON_NOT_OWNER,
    REASON_NOT_YET_AVAILABLE, REASON_POOL_EXHAUSTED,
};
use thiserror::Error;

/// Errors raised while reconciling a managed object.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Constructor-time misconfiguration. Fatal at startup, never retried.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A referenced object or piece of infrastructure does not exist.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Kind of the missing object
        kind: String,
        /// Name (or namespace/name) of the missing object
        name: String,
    },

    /// A dependency exists but is not ready to be consumed yet.
    #[error("{0} is not yet available")]
    NotYetAvailable(String),

    /// Optimistic-concurrency write collision.
    #[error("conflicting write to {0}; object changed since it was read")]
    Conflict(String),

    /// The lock is held by another owner whose lease has not expired.
    #[error("lock '{name}' is held by '{holder}'")]
    LockHeld {
        /// Lock name
        name: String,
        /// Current holder identity
        holder: String,
    },

    /// Waiting for the lock exceeded the configured bound.
    #[error("timed out after {waited_secs}s waiting for lock '{name}'")]
    LockTimeout {
        /// Lock name
        name: String,
        /// Seconds spent waiting
        waited_secs: u64,
    },

    /// Release of a lock held by somebody else.
    #[error("lock '{name}' is held by '{holder}', not by '{owner}'")]
    NotOwner {
        /// Lock name
        name: String,
        /// Identity that attempted the release
        owner: String,
        /// Current holder identity
        holder: String,
    },

    /// No free range of the requested size left in the pool.
    #[error("address pool {pool} has no free /{mask_bits} range left")]
    PoolExhausted {
        /// Pool the allocation was attempted in
        pool: String,
        /// Requested prefix length
        mask_bits: u8,
    },

    /// Internal invariant violation.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Kubernetes API error.
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Serialization of an object failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReconcileError {
    /// Whether retrying the same operation may succeed without operator intervention.
    ///
    /// Kubernetes API errors are transient for rate limiting (429), server errors (5xx)
    /// and transport failures.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Conflict(_) | Self::LockHeld { .. } | Self::LockTimeout { .. } => true,
            Self::Kube(err) => is_transient_kube_error(err),
            Self::InvalidConfig(_)
            | Self::NotFound { .. }
            | Self::NotYetAvailable(_)
            | Self::NotOwner { .. }
            | Self::PoolExhausted { .. }
            | Self::ExecutionFailed(_)
            | Self::Serialization(_) => false,
        }
    }

    /// Whether the error must be surfaced persistently on the object status.
    ///
    /// Such errors cannot be fixed by retrying; the object is requeued slowly.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::PoolExhausted { .. } | Self::InvalidConfig(_) | Self::ExecutionFailed(_)
        )
    }

    /// Whether a step failing with this error ends the pass as canceled.
    ///
    /// A missing or not yet ready dependency is waited out until the next resync;
    /// the pass is neither retried in place nor reported as a failure.
    #[must_use]
    pub fn cancels_pass(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::NotYetAvailable(_))
    }

    /// CamelCase reason used in status conditions and metric labels.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => REASON_INVALID_CONFIG,
            Self::NotFound { .. } => REASON_NOT_FOUND,
            Self::NotYetAvailable(_) => REASON_NOT_YET_AVAILABLE,
            Self::Conflict(_) => REASON_CONFLICT,
            Self::LockHeld { .. } => REASON_LOCK_HELD,
            Self::LockTimeout { .. } => REASON_LOCK_TIMEOUT,
            Self::NotOwner { .. } => REASON_NOT_OWNER,
            Self::PoolExhausted { .. } => REASON_POOL_EXHAUSTED,
            Self::ExecutionFailed(_) | Self::Serialization(_) => REASON_EXECUTION_FAILED,
            Self::Kube(_) => REASON_KUBERNETES_API_ERROR,
        }
    }

    /// Map a Kubernetes API error, turning 404 into [`ReconcileError::NotFound`] and
    /// 409 into [`ReconcileError::Conflict`].
    #[must_use]
    pub fn from_kube(err: kube::Error, kind: &str, name: &str) -> Self {
        match err {
            kube::Error::Api(ref resp) if resp.code == 404 => Self::NotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            },
            kube::Error::Api(ref resp) if resp.code == 409 => {
                Self::Conflict(format!("{kind} {name}"))
            }
            other => Self::Kube(other),
        }
    }
}

/// Determine if a Kubernetes error is retryable.
///
/// # Retryable Errors
///
/// - **HTTP 429** (Too Many Requests) - Rate limiting
/// - **HTTP 5xx** (Server Errors) - Temporary API server issues
/// - **Service Errors** - Network/connection issues
#[must_use]
pub fn is_transient_kube_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(api_err) => {
            api_err.code == 429 || (api_err.code >= 500 && api_err.code < 600)
        }
        kube::Error::Service(_) => true,
        _ => false,
    }
}

/// Whether a Kubernetes error is a 404.
#[must_use]
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
