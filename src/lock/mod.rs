// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Named, owned, time-leased mutual exclusion.
//!
//! A lock is identified by its name. At most one owner holds a live (non-expired)
//! lease on a name at any time. Re-acquiring as the current owner refreshes the
//! lease; a holder that crashes without releasing loses the lock once its TTL
//! elapses, so a dead process can never block the address pool forever.
//!
//! Two implementations are provided:
//!
//! - [`MemoryLock`] - in-process only, for single-replica deployments and tests
//! - [`LeaseLock`] - backed by `coordination.k8s.io/v1` `Lease` objects, shared by
//!   every controller replica
//!
//! # Example
//!
//! ```rust,no_run
//! use clusterops::lock::{acquire_with_backoff, Lock, MemoryLock};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), clusterops::errors::ReconcileError> {
//! let lock = MemoryLock::new();
//! acquire_with_backoff(&lock, "pool-a", "clusterops@2.0.0/default/c1",
//!     Duration::from_secs(30), Duration::from_secs(60)).await?;
//! // critical section
//! lock.release("pool-a", "clusterops@2.0.0/default/c1").await?;
//! # Ok(())
//! # }
//! ```

mod lease;
mod memory;

pub use lease::LeaseLock;
pub use memory::MemoryLock;

use crate::errors::ReconcileError;
use crate::metrics;
use crate::reconcilers::retry::lock_backoff;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Lease-based mutual exclusion primitive.
#[async_trait]
pub trait Lock: Send + Sync {
    /// Acquire `name` for `owner` for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::LockHeld`] if another owner holds a non-expired
    /// lease. Re-acquiring as the current owner succeeds and refreshes the lease.
    async fn acquire(&self, name: &str, owner: &str, ttl: Duration) -> Result<(), ReconcileError>;

    /// Release `name` held by `owner`.
    ///
    /// Releasing a free lock is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::NotOwner`] if another owner holds the lease.
    async fn release(&self, name: &str, owner: &str) -> Result<(), ReconcileError>;

    /// Extend the lease of the current owner.
    ///
    /// # Errors
    ///
    /// Same as [`Lock::acquire`]; a lease that expired and was taken over by another
    /// owner fails with [`ReconcileError::LockHeld`].
    async fn renew(&self, name: &str, owner: &str, ttl: Duration) -> Result<(), ReconcileError> {
        self.acquire(name, owner, ttl).await
    }
}

/// Acquire a lock, waiting with exponential backoff while it is held by others.
///
/// Only [`ReconcileError::LockHeld`] is waited on; any other error is returned
/// immediately.
///
/// # Errors
///
/// Returns [`ReconcileError::LockTimeout`] once `timeout` elapsed without acquiring.
pub async fn acquire_with_backoff(
    lock: &dyn Lock,
    name: &str,
    owner: &str,
    ttl: Duration,
    timeout: Duration,
) -> Result<(), ReconcileError> {
    let start = Instant::now();
    let mut backoff = lock_backoff(timeout);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        match lock.acquire(name, owner, ttl).await {
            Ok(()) => {
                metrics::record_lock_acquired(name, start.elapsed());
                debug!(lock = name, owner, attempt, elapsed = ?start.elapsed(), "Lock acquired");
                return Ok(());
            }
            Err(ReconcileError::LockHeld { holder, .. }) => {
                metrics::record_lock_contended(name);
                let Some(delay) = backoff
                    .next_backoff()
                    .filter(|d| start.elapsed() + *d < timeout)
                else {
                    warn!(lock = name, owner, holder = %holder, attempt, "Gave up waiting for lock");
                    metrics::record_lock_timeout(name);
                    return Err(ReconcileError::LockTimeout {
                        name: name.to_string(),
                        waited_secs: start.elapsed().as_secs(),
                    });
                };
                debug!(lock = name, owner, holder = %holder, retry_after = ?delay, "Lock held, waiting");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
