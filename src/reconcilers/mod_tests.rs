// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the requeue policies

#[cfg(test)]
mod tests {
    use crate::errors::ReconcileError;
    use crate::reconcilers::error_action;
    use kube::runtime::controller::Action;
    use std::time::Duration;

    #[test]
    fn test_permanent_errors_back_off_long() {
        let err = ReconcileError::PoolExhausted {
            pool: "10.0.0.0/8".to_string(),
            mask_bits: 16,
        };
        assert_eq!(error_action(&err), Action::requeue(Duration::from_secs(600)));

        let err = ReconcileError::InvalidConfig("bad".to_string());
        assert_eq!(error_action(&err), Action::requeue(Duration::from_secs(600)));
    }

    #[test]
    fn test_transient_errors_come_back_quickly() {
        let err = ReconcileError::LockTimeout {
            name: "clusterops-ipam-10-0-0-0-8".to_string(),
            waited_secs: 120,
        };
        assert_eq!(error_action(&err), Action::requeue(Duration::from_secs(30)));

        let err = ReconcileError::Conflict("Cluster default/c1".to_string());
        assert_eq!(error_action(&err), Action::requeue(Duration::from_secs(30)));
    }
}
