// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `retry.rs`

#[cfg(test)]
mod tests {
    use super::super::{default_backoff, lock_backoff, retry_api_call, step_backoff};
    use crate::errors::ReconcileError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{reason} for test"),
            reason: reason.to_string(),
            code,
        })
    }

    /// Test that backoff configuration has expected values
    #[test]
    fn test_backoff_configuration() {
        let backoff = default_backoff();

        assert_eq!(
            backoff.initial_interval,
            Duration::from_millis(100),
            "Initial interval should be 100ms"
        );
        assert_eq!(
            backoff.max_interval,
            Duration::from_secs(30),
            "Max interval should be 30 seconds"
        );
        assert_eq!(
            backoff.max_elapsed_time,
            Some(Duration::from_secs(300)),
            "Max elapsed time should be 5 minutes"
        );

        #[allow(clippy::float_cmp)]
        {
            assert_eq!(backoff.multiplier, 2.0);
            assert_eq!(backoff.randomization_factor, 0.1);
        }
    }

    #[test]
    fn test_step_backoff_has_no_elapsed_bound() {
        let backoff = step_backoff();
        assert_eq!(backoff.initial_interval, Duration::from_millis(200));
        assert_eq!(backoff.max_interval, Duration::from_secs(5));
        assert_eq!(backoff.max_elapsed_time, None);
    }

    #[test]
    fn test_lock_backoff_is_bounded_by_timeout() {
        let backoff = lock_backoff(Duration::from_secs(42));
        assert_eq!(backoff.max_elapsed_time, Some(Duration::from_secs(42)));
    }

    /// Test that intervals grow exponentially within the jitter band and cap at max
    #[test]
    fn test_intervals_grow_and_cap() {
        let mut backoff = step_backoff();
        let mut previous_base = 0.2_f64;

        for _ in 0..10 {
            let interval = backoff.next_backoff().unwrap().as_secs_f64();
            assert!(interval >= previous_base * 0.9 - f64::EPSILON);
            assert!(interval <= 5.0 * 1.1 + f64::EPSILON);
            previous_base = (previous_base * 2.0).min(5.0);
        }
        assert_eq!(backoff.current_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_reset_restarts_schedule() {
        let mut backoff = step_backoff();
        backoff.next_backoff();
        backoff.next_backoff();
        backoff.reset();
        assert_eq!(backoff.current_interval, Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_api_call_retries_server_errors() {
        let calls = AtomicU32::new(0);

        let result = retry_api_call(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(api_error(503, "ServiceUnavailable"))
                    } else {
                        Ok("done")
                    }
                }
            },
            "test call",
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_api_call_fails_fast_on_client_errors() {
        let calls = AtomicU32::new(0);

        let result: Result<(), ReconcileError> = retry_api_call(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(api_error(403, "Forbidden")) }
            },
            "test call",
        )
        .await;

        assert!(matches!(result, Err(ReconcileError::Kube(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
