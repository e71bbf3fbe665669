//! Tests for the retry module

use super::*;
use graphload_core::{ClientError, ErrorCode, ExecutionResponse};
use std::time::Duration;

fn permanent(code: ErrorCode) -> graphload_core::Result<ExecutionResponse> {
    Ok(ExecutionResponse::failed(code, "statement rejected"))
}

fn backpressure() -> graphload_core::Result<ExecutionResponse> {
    Ok(ExecutionResponse::failed(
        ErrorCode::E_EXECUTION_ERROR,
        "Storage Error: raft buffer is full. Please retry later.",
    ))
}

fn transport() -> graphload_core::Result<ExecutionResponse> {
    Err(ClientError::Transport("connection reset by peer".into()))
}

fn fast_backoff() -> BackoffStrategy {
    BackoffStrategy::new(10, 100).with_multiplier(2.0)
}

mod backoff_tests {
    use super::*;

    #[test]
    fn test_backoff_exponential_growth() {
        let backoff = BackoffStrategy::new(100, 30_000).with_multiplier(2.0);

        assert_eq!(backoff.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(backoff.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(backoff.calculate_delay(2), Duration::from_millis(400));
        assert_eq!(backoff.calculate_delay(3), Duration::from_millis(800));
    }

    #[test]
    fn test_backoff_max_limit() {
        let backoff = BackoffStrategy::new(100, 1000).with_multiplier(2.0);
        assert_eq!(backoff.calculate_delay(10), Duration::from_millis(1000));
        assert_eq!(backoff.calculate_delay(20), Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_bounds_are_normalized() {
        assert_eq!(BackoffStrategy::new(0, 1000).initial_delay(), Duration::from_millis(1));
        assert_eq!(BackoffStrategy::new(1000, 100).max_delay(), Duration::from_millis(1000));
        assert_eq!(BackoffStrategy::new(100, 1000).with_multiplier(0.5).multiplier(), 1.0);
        assert_eq!(
            BackoffStrategy::new(100, 1000)
                .with_randomization_factor(3.0)
                .randomization_factor(),
            1.0
        );
    }

    #[test]
    fn test_backoff_default_matches_importer_settings() {
        let backoff = BackoffStrategy::default();

        assert_eq!(backoff.initial_delay(), Duration::from_secs(1));
        assert_eq!(backoff.max_delay(), Duration::from_secs(120));
        assert_eq!(backoff.multiplier(), 1.5);
        assert_eq!(backoff.randomization_factor(), 0.1);
        assert_eq!(backoff.max_elapsed(), Some(Duration::from_secs(3600)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_without_jitter_follows_calculate_delay() {
        let strategy = BackoffStrategy::new(100, 1000).with_multiplier(2.0);
        let mut timer = strategy.start();

        for attempt in 0..6 {
            assert_eq!(timer.next_delay(), Some(strategy.calculate_delay(attempt)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_jitter_stays_in_band() {
        let strategy = BackoffStrategy::new(1000, 30_000).with_randomization_factor(0.25);

        for _ in 0..50 {
            let delay = strategy.start().next_delay().unwrap();
            assert!(
                delay >= Duration::from_millis(750) && delay <= Duration::from_millis(1250),
                "delay {delay:?} outside 750ms..=1250ms"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_stops_after_max_elapsed() {
        let strategy = BackoffStrategy::new(1000, 1000).with_max_elapsed_ms(Some(5000));
        let mut timer = strategy.start();

        assert_eq!(timer.next_delay(), Some(Duration::from_secs(1)));
        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(timer.next_delay(), Some(Duration::from_secs(1)));
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(timer.next_delay(), None);

        timer.reset();
        assert_eq!(timer.elapsed(), Duration::ZERO);
        assert_eq!(timer.next_delay(), Some(Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_without_elapsed_cap_never_stops() {
        let strategy = BackoffStrategy::new(1000, 1000).with_max_elapsed_ms(None);
        let mut timer = strategy.start();
        tokio::time::advance(Duration::from_secs(10 * 3600)).await;
        assert!(timer.next_delay().is_some());
    }

    #[test]
    fn test_backoff_deserializes_partial_config() {
        let backoff: BackoffStrategy = toml::from_str("initial_ms = 200\nmultiplier = 3.0").unwrap();
        assert_eq!(backoff.initial_delay(), Duration::from_millis(200));
        assert_eq!(backoff.multiplier(), 3.0);
        assert_eq!(backoff.max_delay(), Duration::from_secs(120));
    }

    #[test]
    fn test_validate_rejects_deserialized_bounds() {
        assert!(BackoffStrategy::default().validate().is_ok());
        assert!(BackoffStrategy::new(0, 0).validate().is_ok());

        for source in [
            "initial_ms = 0",
            "initial_ms = 200\nmax_ms = 100",
            "multiplier = 0.9",
            "multiplier = nan",
            "randomization_factor = -0.1",
            "randomization_factor = nan",
        ] {
            let backoff: BackoffStrategy = toml::from_str(source).unwrap();
            assert!(
                matches!(backoff.validate(), Err(ClientError::Configuration(_))),
                "{source}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_nan_jitter_draws_the_plain_interval() {
        let backoff: BackoffStrategy =
            toml::from_str("initial_ms = 1000\nrandomization_factor = nan").unwrap();
        let mut timer = backoff.start();
        assert_eq!(timer.next_delay(), Some(Duration::from_secs(1)));

        let clamped = BackoffStrategy::new(1000, 1000).with_randomization_factor(f64::NAN);
        assert_eq!(clamped.randomization_factor(), 0.0);
        assert!(clamped.validate().is_ok());
    }
}

mod classifier_tests {
    use super::*;

    #[test]
    fn test_success() {
        assert_eq!(
            classify(&Ok(ExecutionResponse::succeeded(Duration::ZERO))),
            ErrorClass::Success
        );
    }

    #[test]
    fn test_permanent_codes() {
        for code in PERMANENT_ERROR_CODES {
            assert_eq!(classify(&permanent(*code)), ErrorClass::Permanent);
        }
    }

    #[test]
    fn test_permanent_code_wins_over_backpressure_message() {
        let outcome = Ok(ExecutionResponse::failed(
            ErrorCode::E_SYNTAX_ERROR,
            BACKPRESSURE_SIGNATURE,
        ));
        assert_eq!(classify(&outcome), ErrorClass::Permanent);
    }

    #[test]
    fn test_backpressure_signature() {
        assert_eq!(classify(&backpressure()), ErrorClass::Backpressure);
    }

    #[test]
    fn test_transport_error_is_transient() {
        assert_eq!(classify(&transport()), ErrorClass::Transient);
        assert_eq!(classify(&Err(ClientError::Timeout("1s".into()))), ErrorClass::Transient);
    }

    #[test]
    fn test_other_server_codes_are_transient() {
        for code in [
            ErrorCode::E_EXECUTION_ERROR,
            ErrorCode::E_SESSION_TIMEOUT,
            ErrorCode::E_RPC_FAILURE,
        ] {
            let class = classify(&permanent(code));
            assert_eq!(class, ErrorClass::Transient);
            assert!(class.is_retryable());
        }
        assert!(!ErrorClass::Permanent.is_retryable());
    }
}

mod policy_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_permanent_stops_regardless_of_budget() {
        for budget in [0, 1, 5, 100] {
            for code in PERMANENT_ERROR_CODES {
                let mut state = RetryPolicy::new(budget, fast_backoff()).start();
                match state.next(permanent(*code)) {
                    RetryDecision::GiveUp(err) => assert_eq!(err.code(), Some(*code)),
                    other => panic!("expected give up, got {other:?}"),
                }
                assert_eq!(state.remaining(), budget);
                assert_eq!(state.retries(), 0);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_backpressure_resets_budget() {
        let mut state = RetryPolicy::new(3, fast_backoff()).start();

        assert!(matches!(state.next(transport()), RetryDecision::Retry { .. }));
        assert!(matches!(state.next(transport()), RetryDecision::Retry { .. }));
        assert_eq!(state.remaining(), 1);

        match state.next(backpressure()) {
            RetryDecision::Retry { class, .. } => assert_eq!(class, ErrorClass::Backpressure),
            other => panic!("expected retry, got {other:?}"),
        }
        assert_eq!(state.remaining(), state.budget());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backpressure_never_spends_budget() {
        let mut state = RetryPolicy::new(2, fast_backoff()).start();
        for _ in 0..20 {
            assert!(matches!(state.next(backpressure()), RetryDecision::Retry { .. }));
            assert_eq!(state.remaining(), 2);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_budget_exhausts() {
        let mut state = RetryPolicy::new(2, fast_backoff()).start();

        assert!(matches!(state.next(transport()), RetryDecision::Retry { .. }));
        assert!(matches!(state.next(transport()), RetryDecision::Retry { .. }));
        match state.next(transport()) {
            RetryDecision::GiveUp(ClientError::Transport(_)) => {}
            other => panic!("expected transport give up, got {other:?}"),
        }
        assert_eq!(state.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_gives_up_on_first_transient() {
        let mut state = RetryPolicy::new(0, fast_backoff()).start();
        let decision = state.next(permanent(ErrorCode::E_EXECUTION_ERROR));
        assert!(matches!(
            decision,
            RetryDecision::GiveUp(ClientError::Execution { code, .. }) if code == ErrorCode::E_EXECUTION_ERROR
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_retries() {
        let mut state = RetryPolicy::new(3, fast_backoff()).start();
        assert!(matches!(state.next(transport()), RetryDecision::Retry { .. }));
        let decision = state.next(Ok(ExecutionResponse::succeeded(Duration::from_micros(5))));
        match decision {
            RetryDecision::Succeeded(response) => {
                assert_eq!(response.latency(), Duration::from_micros(5))
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(state.retries(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backpressure_bounded_by_elapsed_time() {
        let backoff = BackoffStrategy::new(1000, 1000).with_max_elapsed_ms(Some(3000));
        let mut state = RetryPolicy::new(1, backoff).start();

        let mut retries = 0;
        loop {
            match state.next(backpressure()) {
                RetryDecision::Retry { delay, .. } => {
                    retries += 1;
                    tokio::time::advance(delay).await;
                }
                RetryDecision::GiveUp(err) => {
                    assert!(err.to_string().contains(BACKPRESSURE_SIGNATURE));
                    break;
                }
                RetryDecision::Succeeded(_) => panic!("backpressure never succeeds"),
            }
        }
        assert_eq!(retries, 3);
        assert_eq!(state.remaining(), 1);
    }
}
