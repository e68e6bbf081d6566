// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `wrappers.rs`

#[cfg(test)]
mod tests {
    use super::super::{wrap, RetryPolicy};
    use crate::errors::ReconcileError;
    use crate::metrics::{STEP_ATTEMPTS_TOTAL, STEP_OUTCOMES_TOTAL};
    use crate::pipeline::testing::{calls, cluster, CallLog, RecordingStep};
    use crate::pipeline::PassContext;

    const POLICY: RetryPolicy = RetryPolicy { max_attempts: 3 };

    fn ctx() -> PassContext {
        PassContext::new("2.0.0", "default/c1")
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let log = CallLog::default();
        let step = wrap(
            RecordingStep::new("retry-transient", &log)
                .failing(2, || ReconcileError::Conflict("test".to_string()))
                .boxed(),
            POLICY,
        );

        step.ensure_created(&cluster("c1", "2.0.0"), &mut ctx())
            .await
            .unwrap();

        assert_eq!(calls(&log).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_bounded() {
        let log = CallLog::default();
        let step = wrap(
            RecordingStep::new("retry-bounded", &log)
                .failing(10, || ReconcileError::LockHeld {
                    name: "test".to_string(),
                    holder: "other".to_string(),
                })
                .boxed(),
            POLICY,
        );

        let err = step
            .ensure_created(&cluster("c1", "2.0.0"), &mut ctx())
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::LockHeld { .. }));
        assert_eq!(calls(&log).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_errors_are_not_retried() {
        let log = CallLog::default();
        let step = wrap(
            RecordingStep::new("retry-fatal", &log)
                .failing(1, || ReconcileError::PoolExhausted {
                    pool: "10.0.0.0/24".to_string(),
                    mask_bits: 24,
                })
                .boxed(),
            POLICY,
        );

        let err = step
            .ensure_deleted(&cluster("c1", "2.0.0"), &mut ctx())
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::PoolExhausted { .. }));
        assert_eq!(calls(&log), vec!["retry-fatal.delete"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_attempt_is_observed() {
        let log = CallLog::default();
        let step = wrap(
            RecordingStep::new("metrics-observed", &log)
                .failing(1, || ReconcileError::Conflict("test".to_string()))
                .boxed(),
            POLICY,
        );

        step.ensure_created(&cluster("c1", "2.0.0"), &mut ctx())
            .await
            .unwrap();

        let attempts = STEP_ATTEMPTS_TOTAL.with_label_values(&["metrics-observed", "create"]);
        assert!((attempts.get() - 2.0).abs() < f64::EPSILON);
        let errors =
            STEP_OUTCOMES_TOTAL.with_label_values(&["metrics-observed", "create", "error"]);
        assert!((errors.get() - 1.0).abs() < f64::EPSILON);
        let successes =
            STEP_OUTCOMES_TOTAL.with_label_values(&["metrics-observed", "create", "success"]);
        assert!((successes.get() - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_cancellation_is_not_an_error_outcome() {
        let log = CallLog::default();
        let step = wrap(
            RecordingStep::new("metrics-canceled", &log)
                .canceling()
                .boxed(),
            POLICY,
        );
        let mut ctx = ctx();

        step.ensure_created(&cluster("c1", "2.0.0"), &mut ctx)
            .await
            .unwrap();

        assert!(ctx.is_canceled());
        let canceled =
            STEP_OUTCOMES_TOTAL.with_label_values(&["metrics-canceled", "create", "canceled"]);
        assert!((canceled.get() - 1.0).abs() < f64::EPSILON);
        let errors =
            STEP_OUTCOMES_TOTAL.with_label_values(&["metrics-canceled", "create", "error"]);
        assert!(errors.get() == 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_dependency_is_a_canceled_outcome() {
        let log = CallLog::default();
        let step = wrap(
            RecordingStep::new("metrics-missing-dep", &log)
                .failing(1, || ReconcileError::NotYetAvailable("parent".to_string()))
                .boxed(),
            POLICY,
        );

        let err = step
            .ensure_created(&cluster("c1", "2.0.0"), &mut ctx())
            .await
            .unwrap_err();

        assert!(err.cancels_pass());
        assert_eq!(calls(&log).len(), 1);
        let canceled =
            STEP_OUTCOMES_TOTAL.with_label_values(&["metrics-missing-dep", "create", "canceled"]);
        assert!((canceled.get() - 1.0).abs() < f64::EPSILON);
        let errors =
            STEP_OUTCOMES_TOTAL.with_label_values(&["metrics-missing-dep", "create", "error"]);
        assert!(errors.get() == 0.0);
    }
}
