// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Durable lock backed by Kubernetes `Lease` objects.
//!
//! # Atomicity
//!
//! Every write carries the `resourceVersion` that was read. If the lease changed
//! between read and write, the API server rejects the write with 409 Conflict and
//! the caller observes [`ReconcileError::LockHeld`] (acquire) or
//! [`ReconcileError::Conflict`] (release). Two replicas can therefore never both
//! believe they took over the same expired lease.
//!
//! Released leases are kept with an empty holder so that `leaseTransitions` keeps
//! counting across owners.

use super::Lock;
use crate::errors::{is_not_found, ReconcileError};
use async_trait::async_trait;
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{MicroTime, ObjectMeta};
use k8s_openapi::chrono::{DateTime, Duration as ChronoDuration, Utc};
use kube::api::{Api, PostParams};
use kube::Client;
use std::time::Duration;
use tracing::{debug, info};

/// [`Lock`] implementation storing each lock as a `Lease` in a fixed namespace.
#[derive(Clone)]
pub struct LeaseLock {
    client: Client,
    namespace: String,
}

/// Outcome of comparing an existing lease against an acquiring owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LeaseDecision {
    /// The owner already holds the lease; refresh it.
    Renew,
    /// The lease is free or expired; take it over.
    TakeOver,
    /// Another owner holds a live lease.
    Held(String),
}

impl LeaseLock {
    /// Create a lock storing leases in `namespace`.
    #[must_use]
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
        }
    }

    fn api(&self) -> Api<Lease> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    async fn get(&self, name: &str) -> Result<Option<Lease>, ReconcileError> {
        match self.api().get(name).await {
            Ok(lease) => Ok(Some(lease)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self, name: &str, owner: &str, ttl: Duration) -> Result<(), ReconcileError> {
        let now = Utc::now();
        let lease = Lease {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(self.namespace.clone()),
                ..Default::default()
            },
            spec: Some(held_spec(owner, ttl, now, 0)),
        };

        match self.api().create(&PostParams::default(), &lease).await {
            Ok(_) => {
                info!(lock = name, owner, "Created lease");
                Ok(())
            }
            Err(kube::Error::Api(e)) if e.code == 409 => Err(ReconcileError::LockHeld {
                name: name.to_string(),
                holder: "<concurrent creator>".to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace(&self, name: &str, lease: &Lease) -> Result<(), kube::Error> {
        self.api()
            .replace(name, &PostParams::default(), lease)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl Lock for LeaseLock {
    async fn acquire(&self, name: &str, owner: &str, ttl: Duration) -> Result<(), ReconcileError> {
        let Some(existing) = self.get(name).await? else {
            return self.create(name, owner, ttl).await;
        };

        let now = Utc::now();
        let transitions = existing
            .spec
            .as_ref()
            .and_then(|s| s.lease_transitions)
            .unwrap_or(0);

        let mut updated = existing.clone();
        match decide(&existing, owner, now) {
            LeaseDecision::Held(holder) => {
                return Err(ReconcileError::LockHeld {
                    name: name.to_string(),
                    holder,
                })
            }
            LeaseDecision::Renew => {
                let spec = updated.spec.get_or_insert_with(Default::default);
                spec.renew_time = Some(MicroTime(now));
                spec.lease_duration_seconds = Some(ttl_seconds(ttl));
            }
            LeaseDecision::TakeOver => {
                updated.spec = Some(held_spec(owner, ttl, now, transitions + 1));
            }
        }

        match self.replace(name, &updated).await {
            Ok(()) => {
                debug!(lock = name, owner, "Lease held");
                Ok(())
            }
            Err(kube::Error::Api(e)) if e.code == 409 => Err(ReconcileError::LockHeld {
                name: name.to_string(),
                holder: "<concurrent writer>".to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn release(&self, name: &str, owner: &str) -> Result<(), ReconcileError> {
        let Some(existing) = self.get(name).await? else {
            return Ok(());
        };

        match decide(&existing, owner, Utc::now()) {
            LeaseDecision::Renew => {}
            LeaseDecision::TakeOver => return Ok(()),
            LeaseDecision::Held(holder) => {
                return Err(ReconcileError::NotOwner {
                    name: name.to_string(),
                    owner: owner.to_string(),
                    holder,
                })
            }
        }

        let mut released = existing;
        if let Some(spec) = released.spec.as_mut() {
            spec.holder_identity = None;
            spec.renew_time = None;
            spec.acquire_time = None;
        }

        match self.replace(name, &released).await {
            Ok(()) => {
                debug!(lock = name, owner, "Lease released");
                Ok(())
            }
            Err(e) => Err(ReconcileError::from_kube(e, "Lease", name)),
        }
    }
}

/// Decide what `owner` may do with `lease` at `now`.
pub(crate) fn decide(lease: &Lease, owner: &str, now: DateTime<Utc>) -> LeaseDecision {
    let spec = lease.spec.as_ref();
    let holder = spec.and_then(|s| s.holder_identity.as_deref());

    match holder {
        None | Some("") => LeaseDecision::TakeOver,
        Some(h) if h == owner => LeaseDecision::Renew,
        Some(h) => {
            if is_expired(spec, now) {
                LeaseDecision::TakeOver
            } else {
                LeaseDecision::Held(h.to_string())
            }
        }
    }
}

fn is_expired(spec: Option<&LeaseSpec>, now: DateTime<Utc>) -> bool {
    let renewed = spec.and_then(|s| s.renew_time.as_ref().or(s.acquire_time.as_ref()));
    let duration = spec.and_then(|s| s.lease_duration_seconds);

    match (renewed, duration) {
        (Some(at), Some(secs)) => now > at.0 + ChronoDuration::seconds(i64::from(secs)),
        _ => true,
    }
}

fn held_spec(owner: &str, ttl: Duration, now: DateTime<Utc>, transitions: i32) -> LeaseSpec {
    LeaseSpec {
        holder_identity: Some(owner.to_string()),
        lease_duration_seconds: Some(ttl_seconds(ttl)),
        acquire_time: Some(MicroTime(now)),
        renew_time: Some(MicroTime(now)),
        lease_transitions: Some(transitions),
        ..Default::default()
    }
}

fn ttl_seconds(ttl: Duration) -> i32 {
    i32::try_from(ttl.as_secs().max(1)).unwrap_or(i32::MAX)
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod lease_tests;
