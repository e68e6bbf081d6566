// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `memory.rs`

#[cfg(test)]
mod tests {
    use super::super::MemoryLock;
    use crate::errors::ReconcileError;
    use crate::lock::Lock;
    use std::time::Duration;

    const TTL: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn test_acquire_free_lock() {
        let lock = MemoryLock::new();
        lock.acquire("pool", "a", TTL).await.unwrap();
        assert_eq!(lock.holder("pool").await.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_same_owner_reacquire_is_idempotent() {
        let lock = MemoryLock::new();
        lock.acquire("pool", "a", TTL).await.unwrap();
        lock.acquire("pool", "a", TTL).await.unwrap();
        lock.renew("pool", "a", TTL).await.unwrap();
        assert_eq!(lock.holder("pool").await.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_other_owner_gets_lock_held() {
        let lock = MemoryLock::new();
        lock.acquire("pool", "a", TTL).await.unwrap();

        let err = lock.acquire("pool", "b", TTL).await.unwrap_err();
        match err {
            ReconcileError::LockHeld { name, holder } => {
                assert_eq!(name, "pool");
                assert_eq!(holder, "a");
            }
            other => panic!("expected LockHeld, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_locks_are_independent_by_name() {
        let lock = MemoryLock::new();
        lock.acquire("pool-1", "a", TTL).await.unwrap();
        lock.acquire("pool-2", "b", TTL).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lease_can_be_taken_over() {
        let lock = MemoryLock::new();
        lock.acquire("pool", "crashed", Duration::from_secs(5))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;

        lock.acquire("pool", "b", TTL).await.unwrap();
        assert_eq!(lock.holder("pool").await.as_deref(), Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_renew_extends_lease() {
        let lock = MemoryLock::new();
        lock.acquire("pool", "a", Duration::from_secs(5)).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        lock.renew("pool", "a", Duration::from_secs(5)).await.unwrap();
        tokio::time::advance(Duration::from_secs(4)).await;

        assert!(lock.acquire("pool", "b", TTL).await.is_err());
    }

    #[tokio::test]
    async fn test_release_free_lock_is_noop() {
        let lock = MemoryLock::new();
        lock.release("pool", "a").await.unwrap();
    }

    #[tokio::test]
    async fn test_release_by_other_owner_is_rejected() {
        let lock = MemoryLock::new();
        lock.acquire("pool", "a", TTL).await.unwrap();

        let err = lock.release("pool", "b").await.unwrap_err();
        assert!(matches!(err, ReconcileError::NotOwner { .. }));
        assert_eq!(lock.holder("pool").await.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_release_makes_lock_available() {
        let lock = MemoryLock::new();
        lock.acquire("pool", "a", TTL).await.unwrap();
        lock.release("pool", "a").await.unwrap();

        lock.acquire("pool", "b", TTL).await.unwrap();
        assert_eq!(lock.holder("pool").await.as_deref(), Some("b"));
    }
}
