// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the status step

#[cfg(test)]
mod tests {
    use super::super::{ready_message, ready_patch, StatusResource, StatusWriter};
    use crate::crd::{Cluster, ClusterStatus};
    use crate::errors::ReconcileError;
    use crate::pipeline::testing::cluster;
    use crate::pipeline::{PassContext, Resource};
    use crate::reconcilers::status::create_condition;
    use crate::status_reasons::{
        CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, REASON_POOL_EXHAUSTED, REASON_RECONCILED,
    };
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        patches: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl StatusWriter<Cluster> for Recorder {
        async fn write(&self, _obj: &Cluster, status: Value) -> Result<(), ReconcileError> {
            self.patches.lock().unwrap().push(status);
            Ok(())
        }
    }

    fn reconciled(generation: i64, message: &str) -> Cluster {
        let mut c = cluster("c1", "2.0.0");
        c.metadata.generation = Some(generation);
        let mut ready = create_condition("Ready", CONDITION_STATUS_TRUE, REASON_RECONCILED, message);
        ready.last_transition_time = Some("2025-01-01T00:00:00+00:00".to_string());
        c.status = Some(ClusterStatus {
            conditions: vec![ready],
            observed_generation: Some(generation),
            subnet: Some("10.0.0.0/16".to_string()),
            operator_version: Some("2.0.0".to_string()),
        });
        c
    }

    #[test]
    fn test_first_reconcile_writes_ready() {
        let mut c = cluster("c1", "2.0.0");
        c.metadata.generation = Some(1);

        let patch = ready_patch(&c, "2.0.0", CONDITION_STATUS_TRUE, REASON_RECONCILED, "ok")
            .expect("patch");
        assert_eq!(patch["conditions"][0]["type"], "Ready");
        assert_eq!(patch["conditions"][0]["status"], "True");
        assert_eq!(patch["observedGeneration"], 1);
        assert_eq!(patch["operatorVersion"], "2.0.0");
    }

    #[test]
    fn test_unchanged_status_is_not_written() {
        let c = reconciled(3, "ok");
        assert!(ready_patch(&c, "2.0.0", CONDITION_STATUS_TRUE, REASON_RECONCILED, "ok").is_none());
    }

    #[test]
    fn test_new_generation_is_written_with_preserved_transition_time() {
        let mut c = reconciled(3, "ok");
        c.metadata.generation = Some(4);

        let patch = ready_patch(&c, "2.0.0", CONDITION_STATUS_TRUE, REASON_RECONCILED, "ok")
            .expect("patch");
        assert_eq!(patch["observedGeneration"], 4);
        assert_eq!(
            patch["conditions"][0]["lastTransitionTime"],
            "2025-01-01T00:00:00+00:00"
        );
    }

    #[test]
    fn test_status_flip_resets_transition_time() {
        let c = reconciled(3, "ok");
        let patch = ready_patch(
            &c,
            "2.0.0",
            CONDITION_STATUS_FALSE,
            REASON_POOL_EXHAUSTED,
            "no /16 left",
        )
        .expect("patch");
        assert_eq!(patch["conditions"][0]["reason"], REASON_POOL_EXHAUSTED);
        assert_ne!(
            patch["conditions"][0]["lastTransitionTime"],
            "2025-01-01T00:00:00+00:00"
        );
    }

    #[test]
    fn test_version_migration_is_written() {
        let c = reconciled(3, "ok");
        let patch = ready_patch(&c, "3.0.0", CONDITION_STATUS_TRUE, REASON_RECONCILED, "ok")
            .expect("patch");
        assert_eq!(patch["operatorVersion"], "3.0.0");
    }

    #[tokio::test]
    async fn test_step_mentions_subnet_from_context() {
        let recorder = Arc::new(Recorder::default());
        let step = StatusResource::new(recorder.clone() as Arc<dyn StatusWriter<Cluster>>);
        let c = cluster("c1", "2.0.0");
        let mut ctx = PassContext::for_object("2.0.0", &c);
        ctx.subnet = Some("10.1.0.0/16".parse().unwrap());

        step.ensure_created(&c, &mut ctx).await.unwrap();

        let patches = recorder.patches.lock().unwrap();
        assert_eq!(patches.len(), 1);
        let message = patches[0]["conditions"][0]["message"].as_str().unwrap();
        assert!(message.contains("10.1.0.0/16"));
        assert!(message.contains("2.0.0"));
    }

    #[test]
    fn test_ready_message_names_cluster_subnet() {
        let mut ctx = PassContext::new("2.0.0", "default/workers");
        assert_eq!(ready_message(&ctx), "Reconciled by pipeline 2.0.0");

        ctx.subnet = Some("10.1.16.0/24".parse().unwrap());
        ctx.cluster_subnet = Some("10.1.0.0/16".parse().unwrap());
        assert_eq!(
            ready_message(&ctx),
            "Reconciled by pipeline 2.0.0 with subnet 10.1.16.0/24 in cluster 10.1.0.0/16"
        );
    }

    #[tokio::test]
    async fn test_step_skips_write_when_unchanged() {
        let recorder = Arc::new(Recorder::default());
        let step = StatusResource::new(recorder.clone() as Arc<dyn StatusWriter<Cluster>>);
        let c = reconciled(1, "Reconciled by pipeline 2.0.0");
        let mut ctx = PassContext::for_object("2.0.0", &c);

        step.ensure_created(&c, &mut ctx).await.unwrap();

        assert!(recorder.patches.lock().unwrap().is_empty());
    }
}
