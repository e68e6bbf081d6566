// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `machine.rs`

#[cfg(test)]
mod tests {
    use super::super::{next_state, Observation};
    use crate::crd::DrainState;
    use crate::status_reasons::{
        REASON_DRAIN_COMPLETED, REASON_DRAIN_STARTED, REASON_DRAIN_TIMED_OUT,
        REASON_INSTANCE_TERMINATED, REASON_NODE_DISAPPEARED,
    };
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(600);

    fn serving() -> Observation {
        Observation {
            node_exists: true,
            instance_in_group: true,
            instance_terminating: false,
            pods_remaining: 3,
            draining_for: None,
        }
    }

    fn terminating() -> Observation {
        Observation {
            instance_terminating: true,
            ..serving()
        }
    }

    fn to(state: DrainState, obs: Observation) -> Option<(DrainState, &'static str)> {
        next_state(state, &obs, TIMEOUT).map(|t| {
            assert_eq!(t.from, state);
            (t.to, t.reason)
        })
    }

    #[test]
    fn test_pending_waits_until_instance_terminates() {
        assert_eq!(to(DrainState::Pending, serving()), None);
        assert_eq!(
            to(DrainState::Pending, terminating()),
            Some((DrainState::Draining, REASON_DRAIN_STARTED))
        );
    }

    #[test]
    fn test_draining_waits_for_pods() {
        let obs = Observation {
            draining_for: Some(Duration::from_secs(30)),
            ..terminating()
        };
        assert_eq!(to(DrainState::Draining, obs), None);

        let empty = Observation {
            pods_remaining: 0,
            ..obs
        };
        assert_eq!(
            to(DrainState::Draining, empty),
            Some((DrainState::Drained, REASON_DRAIN_COMPLETED))
        );
    }

    #[test]
    fn test_drain_timeout_forces_drained() {
        let obs = Observation {
            draining_for: Some(TIMEOUT),
            ..terminating()
        };
        assert_eq!(
            to(DrainState::Draining, obs),
            Some((DrainState::Drained, REASON_DRAIN_TIMED_OUT))
        );
    }

    #[test]
    fn test_drained_waits_for_instance_removal() {
        let drained = Observation {
            pods_remaining: 0,
            ..terminating()
        };
        assert_eq!(to(DrainState::Drained, drained), None);

        let gone = Observation {
            instance_in_group: false,
            ..drained
        };
        assert_eq!(
            to(DrainState::Drained, gone),
            Some((DrainState::Terminated, REASON_INSTANCE_TERMINATED))
        );
    }

    #[test]
    fn test_instance_leaving_mid_drain_terminates() {
        let gone = Observation {
            instance_in_group: false,
            draining_for: Some(Duration::from_secs(5)),
            ..terminating()
        };
        assert_eq!(
            to(DrainState::Draining, gone),
            Some((DrainState::Terminated, REASON_INSTANCE_TERMINATED))
        );
    }

    #[test]
    fn test_node_disappearing_mid_drain_terminates() {
        let gone = Observation {
            node_exists: false,
            pods_remaining: 0,
            draining_for: Some(Duration::from_secs(5)),
            ..terminating()
        };
        assert_eq!(
            to(DrainState::Draining, gone),
            Some((DrainState::Terminated, REASON_NODE_DISAPPEARED))
        );
        assert_eq!(
            to(DrainState::Pending, gone),
            Some((DrainState::Terminated, REASON_NODE_DISAPPEARED))
        );
    }

    #[test]
    fn test_terminated_is_terminal() {
        for obs in [serving(), terminating()] {
            assert_eq!(to(DrainState::Terminated, obs), None);
        }
    }

    #[test]
    fn test_no_state_is_skipped_without_disappearance() {
        // Even with no pods left, a pending drain goes through Draining first.
        let obs = Observation {
            pods_remaining: 0,
            ..terminating()
        };
        assert_eq!(
            to(DrainState::Pending, obs),
            Some((DrainState::Draining, REASON_DRAIN_STARTED))
        );
    }
}
