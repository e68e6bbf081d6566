// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use super::super::{has_finalizer, with_finalizer, without_finalizer};
    use crate::crd::{Cluster, ClusterSpec};

    const TEST_FINALIZER: &str = "test.firestoned.io/finalizer";
    const OTHER_FINALIZER: &str = "other.example.com/finalizer";

    fn cluster_with(finalizers: Option<Vec<&str>>) -> Cluster {
        let mut cluster = Cluster::new("c1", ClusterSpec::default());
        cluster.metadata.namespace = Some("default".to_string());
        cluster.metadata.finalizers =
            finalizers.map(|f| f.into_iter().map(ToString::to_string).collect());
        cluster
    }

    #[test]
    fn test_has_finalizer() {
        assert!(!has_finalizer(&cluster_with(None), TEST_FINALIZER));
        assert!(!has_finalizer(
            &cluster_with(Some(vec![OTHER_FINALIZER])),
            TEST_FINALIZER
        ));
        assert!(has_finalizer(
            &cluster_with(Some(vec![OTHER_FINALIZER, TEST_FINALIZER])),
            TEST_FINALIZER
        ));
    }

    #[test]
    fn test_adding_keeps_foreign_finalizers() {
        let cluster = cluster_with(Some(vec![OTHER_FINALIZER]));
        assert_eq!(
            with_finalizer(&cluster, TEST_FINALIZER),
            Some(vec![OTHER_FINALIZER.to_string(), TEST_FINALIZER.to_string()])
        );
    }

    #[test]
    fn test_adding_is_idempotent() {
        let cluster = cluster_with(Some(vec![TEST_FINALIZER]));
        assert_eq!(with_finalizer(&cluster, TEST_FINALIZER), None);
    }

    #[test]
    fn test_removing_keeps_foreign_finalizers() {
        let cluster = cluster_with(Some(vec![TEST_FINALIZER, OTHER_FINALIZER]));
        assert_eq!(
            without_finalizer(&cluster, TEST_FINALIZER),
            Some(vec![OTHER_FINALIZER.to_string()])
        );
    }

    #[test]
    fn test_removing_absent_finalizer_is_noop() {
        assert_eq!(without_finalizer(&cluster_with(None), TEST_FINALIZER), None);
    }
}
