//! Behavior-driven tests for circuit breaker resilience: fast-fail while
//! open, recovery through half-open trials, and graceful degradation to the
//! durable store while the upstream is down.

use ratevault_tests::*;

use rust_decimal_macros::dec;
use std::time::Duration;
use time::macros::date;

#[tokio::test]
async fn fifty_failing_calls_open_the_circuit_and_later_calls_skip_the_network() {
    // Given: an upstream that refuses every connection
    let client = Arc::new(ScriptedHttpClient::always_failing());
    let breaker = Arc::new(CircuitBreaker::default());
    let fetcher = FixerRateSource::new(
        test_fixer_config(),
        Arc::clone(&client) as Arc<dyn HttpClient>,
        Arc::clone(&breaker),
    );

    // When: fifty lookups fail
    for _ in 0..50 {
        let error = fetcher
            .get_rates(date!(2022 - 06 - 20))
            .await
            .expect_err("transport down");
        assert!(error.retryable());
    }

    // Then: the circuit is open and subsequent calls never reach the wire
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(client.request_count(), 50);

    for _ in 0..10 {
        let error = fetcher
            .get_rates(date!(2022 - 06 - 20))
            .await
            .expect_err("fast fail");
        assert!(matches!(error, RatesError::Provider(_)));
    }
    assert_eq!(client.request_count(), 50, "no network I/O while open");
}

#[tokio::test]
async fn the_circuit_recovers_through_half_open_trial_calls() {
    // Given: a breaker that opens quickly and needs one good trial to close
    let client = Arc::new(ScriptedHttpClient::always_failing());
    let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
        window_size: 4,
        min_calls: 2,
        open_wait: Duration::from_millis(50),
        half_open_permits: 1,
        ..CircuitBreakerConfig::default()
    }));
    let fetcher = FixerRateSource::new(
        test_fixer_config(),
        Arc::clone(&client) as Arc<dyn HttpClient>,
        Arc::clone(&breaker),
    );

    for _ in 0..2 {
        fetcher
            .get_rates(date!(2022 - 06 - 20))
            .await
            .expect_err("transport down");
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    // While open: fail fast, no wire traffic
    fetcher
        .get_rates(date!(2022 - 06 - 20))
        .await
        .expect_err("circuit open");
    assert_eq!(client.request_count(), 2);

    // When: the wait elapses and the upstream is healthy again
    tokio::time::sleep(Duration::from_millis(60)).await;
    client.push_response(Ok(HttpResponse::ok_json(success_body("2022-06-20"))));

    let snapshot = fetcher
        .get_rates(date!(2022 - 06 - 20))
        .await
        .expect("trial call succeeds");

    // Then: the trial call went out and the circuit closed
    assert_eq!(snapshot.rates["USD"], dec!(1.04));
    assert_eq!(client.request_count(), 3);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test]
async fn a_failed_trial_call_reopens_the_circuit() {
    let client = Arc::new(ScriptedHttpClient::always_failing());
    let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
        window_size: 4,
        min_calls: 2,
        open_wait: Duration::from_millis(50),
        half_open_permits: 1,
        ..CircuitBreakerConfig::default()
    }));
    let fetcher = FixerRateSource::new(
        test_fixer_config(),
        Arc::clone(&client) as Arc<dyn HttpClient>,
        Arc::clone(&breaker),
    );

    for _ in 0..2 {
        fetcher
            .get_rates(date!(2022 - 06 - 20))
            .await
            .expect_err("transport down");
    }
    tokio::time::sleep(Duration::from_millis(60)).await;

    // The trial call also fails: straight back to open
    fetcher
        .get_rates(date!(2022 - 06 - 20))
        .await
        .expect_err("trial fails");
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test]
async fn not_found_responses_do_not_count_against_the_breaker() {
    // Given: the upstream is healthy but has no data for these dates
    let empty_body = r#"{"success":true,"base":"EUR","date":"2000-01-01","rates":{}}"#;
    let client = Arc::new(ScriptedHttpClient::new(
        (0..10)
            .map(|_| Ok(HttpResponse::ok_json(empty_body)))
            .collect(),
    ));
    let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
        window_size: 10,
        min_calls: 5,
        ..CircuitBreakerConfig::default()
    }));
    let fetcher = FixerRateSource::new(
        test_fixer_config(),
        Arc::clone(&client) as Arc<dyn HttpClient>,
        Arc::clone(&breaker),
    );

    // When: many lookups come back empty
    for _ in 0..10 {
        let error = fetcher
            .get_rates(date!(2000 - 01 - 01))
            .await
            .expect_err("no data");
        assert!(matches!(error, RatesError::NotFound(_)));
    }

    // Then: absence is not failure; the circuit stays closed
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test]
async fn store_known_dates_keep_working_while_the_upstream_is_down() {
    // Given: a date already persisted, and a circuit forced open by failures
    let day = date!(2022 - 06 - 20);
    let client = Arc::new(ScriptedHttpClient::always_failing());
    let breaker = Arc::new(CircuitBreaker::default());
    let (service, store) = full_pipeline(Arc::clone(&client), Arc::clone(&breaker)).await;

    for (currency, rate) in [("USD", dec!(1.04)), ("GBP", dec!(0.85))] {
        let row = StoredRate::new("EUR", currency, day, rate);
        store.insert_if_absent(&row).await.expect("seed");
    }
    for _ in 0..50 {
        breaker.record_failure(Duration::from_millis(10));
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    // When: the date is requested during the outage
    let snapshot = service.get_rates("2022-06-20").await.expect("lookup");

    // Then: the durable store answers and nothing touches the network
    assert_eq!(snapshot.rates["USD"], dec!(1.04));
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn slow_upstream_calls_trip_the_breaker_even_when_they_succeed() {
    // Recorded durations drive the window directly; no real sleeping needed.
    let breaker = CircuitBreaker::new(CircuitBreakerConfig {
        window_size: 10,
        min_calls: 5,
        ..CircuitBreakerConfig::default()
    });

    for _ in 0..5 {
        breaker.record_success(Duration::from_secs(3));
    }

    assert_eq!(breaker.state(), CircuitState::Open);
}
