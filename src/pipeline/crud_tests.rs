// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `crud.rs`

#[cfg(test)]
mod tests {
    use super::super::{CrudOps, CrudResource};
    use crate::crd::Cluster;
    use crate::errors::ReconcileError;
    use crate::pipeline::testing::cluster;
    use crate::pipeline::{PassContext, Resource};
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    type Names = BTreeSet<String>;

    /// Keeps a set of names in memory converging toward `desired`.
    struct NameSet {
        existing: Mutex<Names>,
        desired: Names,
        cancel_on_create: bool,
    }

    impl NameSet {
        fn new(existing: &[&str], desired: &[&str]) -> Self {
            Self {
                existing: Mutex::new(existing.iter().map(ToString::to_string).collect()),
                desired: desired.iter().map(ToString::to_string).collect(),
                cancel_on_create: false,
            }
        }

        fn existing(&self) -> Vec<String> {
            self.existing.lock().unwrap().iter().cloned().collect()
        }
    }

    #[async_trait]
    impl CrudOps<Cluster> for &'static NameSet {
        type State = Names;

        fn name(&self) -> &str {
            "names"
        }

        async fn current_state(
            &self,
            _obj: &Cluster,
            _ctx: &mut PassContext,
        ) -> Result<Names, ReconcileError> {
            Ok(self.existing.lock().unwrap().clone())
        }

        async fn desired_state(
            &self,
            _obj: &Cluster,
            _current: &Names,
            _ctx: &mut PassContext,
        ) -> Result<Names, ReconcileError> {
            Ok(self.desired.clone())
        }

        fn create_change(&self, current: &Names, desired: &Names) -> Option<Names> {
            let missing: Names = desired.difference(current).cloned().collect();
            (!missing.is_empty()).then_some(missing)
        }

        fn delete_change(&self, current: &Names, desired: &Names) -> Option<Names> {
            let stale: Names = current.difference(desired).cloned().collect();
            (!stale.is_empty()).then_some(stale)
        }

        async fn apply_create(
            &self,
            _obj: &Cluster,
            ctx: &mut PassContext,
            change: Names,
        ) -> Result<(), ReconcileError> {
            self.existing.lock().unwrap().extend(change);
            if self.cancel_on_create {
                ctx.cancel("created, waiting");
            }
            Ok(())
        }

        async fn apply_delete(
            &self,
            _obj: &Cluster,
            _ctx: &mut PassContext,
            change: Names,
        ) -> Result<(), ReconcileError> {
            let mut existing = self.existing.lock().unwrap();
            for name in change {
                existing.remove(&name);
            }
            Ok(())
        }
    }

    fn leak(set: NameSet) -> &'static NameSet {
        Box::leak(Box::new(set))
    }

    fn ctx() -> PassContext {
        PassContext::new("2.0.0", "default/c1")
    }

    #[tokio::test]
    async fn test_create_pass_converges() {
        let names = leak(NameSet::new(&["a", "stale"], &["a", "b"]));
        let step = CrudResource::new(names);

        step.ensure_created(&cluster("c1", "2.0.0"), &mut ctx())
            .await
            .unwrap();

        assert_eq!(names.existing(), vec!["a", "b"]);
        assert_eq!(Resource::<Cluster>::name(&step), "names");
    }

    #[tokio::test]
    async fn test_create_pass_is_idempotent() {
        let names = leak(NameSet::new(&[], &["a"]));
        let step = CrudResource::new(names);
        let obj = cluster("c1", "2.0.0");

        step.ensure_created(&obj, &mut ctx()).await.unwrap();
        step.ensure_created(&obj, &mut ctx()).await.unwrap();

        assert_eq!(names.existing(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_delete_pass_removes_everything() {
        let names = leak(NameSet::new(&["a", "b"], &["a", "b"]));
        let step = CrudResource::new(names);

        step.ensure_deleted(&cluster("c1", "2.0.0"), &mut ctx())
            .await
            .unwrap();

        assert!(names.existing().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_create_skips_delete() {
        let mut set = NameSet::new(&["stale"], &["a"]);
        set.cancel_on_create = true;
        let names = leak(set);
        let step = CrudResource::new(names);
        let mut ctx = ctx();

        step.ensure_created(&cluster("c1", "2.0.0"), &mut ctx)
            .await
            .unwrap();

        assert!(ctx.is_canceled());
        assert_eq!(names.existing(), vec!["a", "stale"]);
    }
}
