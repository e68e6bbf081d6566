// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `resource_set.rs`

#[cfg(test)]
mod tests {
    use super::super::{PassOutcome, ResourceSet};
    use crate::crd::Cluster;
    use crate::errors::ReconcileError;
    use crate::pipeline::testing::{calls, cluster, CallLog, RecordingStep};
    use crate::pipeline::PassContext;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use k8s_openapi::chrono::Utc;

    fn set(steps: Vec<Box<dyn crate::pipeline::Resource<Cluster>>>) -> ResourceSet<Cluster> {
        ResourceSet::for_version("2.0.0", steps, PassContext::for_object)
    }

    #[tokio::test]
    async fn test_steps_run_in_order() {
        let log = CallLog::default();
        let set = set(vec![
            RecordingStep::new("a", &log).boxed(),
            RecordingStep::new("b", &log).boxed(),
            RecordingStep::new("c", &log).boxed(),
        ]);

        let outcome = set.reconcile(&cluster("c1", "2.0.0")).await.unwrap();

        assert_eq!(outcome, PassOutcome::Completed);
        assert_eq!(calls(&log), vec!["a.create", "b.create", "c.create"]);
    }

    #[tokio::test]
    async fn test_cancellation_skips_remaining_steps_without_error() {
        let log = CallLog::default();
        let set = set(vec![
            RecordingStep::new("a", &log).boxed(),
            RecordingStep::new("b", &log).canceling().boxed(),
            RecordingStep::new("c", &log).boxed(),
        ]);

        let outcome = set.reconcile(&cluster("c1", "2.0.0")).await.unwrap();

        assert_eq!(
            outcome,
            PassOutcome::Canceled {
                step: "b".to_string(),
                reason: "b canceled".to_string(),
            }
        );
        assert_eq!(calls(&log), vec!["a.create", "b.create"]);
    }

    #[tokio::test]
    async fn test_error_aborts_pass() {
        let log = CallLog::default();
        let set = set(vec![
            RecordingStep::new("a", &log)
                .failing(1, || ReconcileError::ExecutionFailed("boom".to_string()))
                .boxed(),
            RecordingStep::new("b", &log).boxed(),
        ]);

        let err = set.reconcile(&cluster("c1", "2.0.0")).await.unwrap_err();

        assert!(matches!(err, ReconcileError::ExecutionFailed(_)));
        assert_eq!(calls(&log), vec!["a.create"]);
    }

    #[tokio::test]
    async fn test_missing_dependency_cancels_pass() {
        let failures: [fn() -> ReconcileError; 2] = [
            || ReconcileError::NotFound {
                kind: "Cluster".to_string(),
                name: "default/c1".to_string(),
            },
            || ReconcileError::NotYetAvailable("Cluster default/parent".to_string()),
        ];

        for failure in failures {
            let log = CallLog::default();
            let set = set(vec![
                RecordingStep::new("a", &log).failing(1, failure).boxed(),
                RecordingStep::new("b", &log).boxed(),
            ]);

            let outcome = set.reconcile(&cluster("c1", "2.0.0")).await.unwrap();

            assert_eq!(
                outcome,
                PassOutcome::Canceled {
                    step: "a".to_string(),
                    reason: failure().to_string(),
                }
            );
            assert_eq!(calls(&log), vec!["a.create"]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrapped_missing_dependency_is_not_retried() {
        let log = CallLog::default();
        let set = set(vec![
            crate::pipeline::wrap(
                RecordingStep::new("dep-gate", &log)
                    .failing(5, || ReconcileError::NotYetAvailable("parent".to_string()))
                    .boxed(),
                crate::pipeline::RetryPolicy { max_attempts: 3 },
            ),
            RecordingStep::new("b", &log).boxed(),
        ]);

        let outcome = set.reconcile(&cluster("c1", "2.0.0")).await.unwrap();

        assert!(matches!(outcome, PassOutcome::Canceled { ref step, .. } if step == "dep-gate"));
        assert_eq!(calls(&log), vec!["dep-gate.create"]);
    }

    #[tokio::test]
    async fn test_deleting_object_runs_delete_pass() {
        let log = CallLog::default();
        let set = set(vec![
            RecordingStep::new("a", &log).boxed(),
            RecordingStep::new("b", &log).boxed(),
        ]);
        let mut obj = cluster("c1", "2.0.0");
        obj.metadata.deletion_timestamp = Some(Time(Utc::now()));

        set.reconcile(&obj).await.unwrap();

        assert_eq!(calls(&log), vec!["a.delete", "b.delete"]);
    }

    #[tokio::test]
    async fn test_each_pass_gets_fresh_context() {
        let log = CallLog::default();
        let set = set(vec![
            RecordingStep::new("a", &log).canceling().boxed(),
            RecordingStep::new("b", &log).boxed(),
        ]);
        let obj = cluster("c1", "2.0.0");

        set.reconcile(&obj).await.unwrap();
        set.reconcile(&obj).await.unwrap();

        assert_eq!(calls(&log), vec!["a.create", "a.create"]);
    }

    #[test]
    fn test_for_version_predicate() {
        let set = set(vec![]);
        assert!(set.handles(&cluster("c1", "2.0.0")));
        assert!(!set.handles(&cluster("c1", "1.0.0")));

        let mut unlabeled = cluster("c1", "2.0.0");
        unlabeled.metadata.labels = None;
        assert!(!set.handles(&unlabeled));
    }
}
