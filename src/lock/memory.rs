// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-process lock. Only valid while a single controller replica runs.

use super::Lock;
use crate::errors::ReconcileError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Holder {
    owner: String,
    expires_at: Instant,
}

/// In-memory implementation of [`Lock`] with TTL expiry.
#[derive(Debug, Default)]
pub struct MemoryLock {
    holders: Mutex<HashMap<String, Holder>>,
}

impl MemoryLock {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current live holder of `name`, if any.
    pub async fn holder(&self, name: &str) -> Option<String> {
        let holders = self.holders.lock().await;
        holders
            .get(name)
            .filter(|h| h.expires_at > Instant::now())
            .map(|h| h.owner.clone())
    }
}

#[async_trait]
impl Lock for MemoryLock {
    async fn acquire(&self, name: &str, owner: &str, ttl: Duration) -> Result<(), ReconcileError> {
        let mut holders = self.holders.lock().await;
        let now = Instant::now();

        if let Some(current) = holders.get(name) {
            if current.owner != owner && current.expires_at > now {
                return Err(ReconcileError::LockHeld {
                    name: name.to_string(),
                    holder: current.owner.clone(),
                });
            }
        }

        holders.insert(
            name.to_string(),
            Holder {
                owner: owner.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn release(&self, name: &str, owner: &str) -> Result<(), ReconcileError> {
        let mut holders = self.holders.lock().await;

        match holders.get(name) {
            None => Ok(()),
            Some(current) if current.owner == owner || current.expires_at <= Instant::now() => {
                holders.remove(name);
                Ok(())
            }
            Some(current) => Err(ReconcileError::NotOwner {
                name: name.to_string(),
                owner: owner.to_string(),
                holder: current.owner.clone(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
