// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `persister.rs`

#[cfg(test)]
mod tests {
    use super::super::subnet_patch;
    use crate::errors::ReconcileError;
    use crate::pipeline::testing::cluster;

    #[test]
    fn test_patch_is_preconditioned_on_resource_version() {
        let mut live = cluster("c1", "2.0.0");
        live.metadata.resource_version = Some("42".to_string());

        let patch = subnet_patch(&live, "10.0.3.0/24".parse().unwrap()).unwrap();

        assert_eq!(patch["metadata"]["resourceVersion"], "42");
        assert_eq!(patch["status"]["subnet"], "10.0.3.0/24");
        assert!(patch["status"].get("conditions").is_none());
    }

    #[test]
    fn test_unversioned_object_is_refused() {
        let live = cluster("c1", "2.0.0");

        let err = subnet_patch(&live, "10.0.3.0/24".parse().unwrap()).unwrap_err();

        assert!(matches!(err, ReconcileError::ExecutionFailed(_)));
    }
}
