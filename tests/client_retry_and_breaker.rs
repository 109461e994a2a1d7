//! End-to-end scenarios 1, 2, 3, 4 (spec §8): the resilient client's retry
//! and circuit-breaker behavior against a real (mocked) HTTP server.

use std::time::Duration;

use tower_resilience_circuitbreaker::CircuitBreakerRegistry;
use tower_resilience_client::{ClientError, ResilientClient};
use tower_resilience_retry::RetrierConfig;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn retry_succeeds_on_third_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = ResilientClient::builder()
        .name("retry-third-attempt")
        .retry(RetrierConfig::new(3, Duration::from_millis(10)))
        .build();

    let request = reqwest::Client::new().get(server.uri()).build().unwrap();
    let response = client.execute(request).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn no_retry_on_4xx() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(400)).mount(&server).await;

    let client = ResilientClient::builder()
        .name("no-retry-on-4xx")
        .retry(RetrierConfig::new(3, Duration::from_millis(10)))
        .build();

    let request = reqwest::Client::new().get(server.uri()).build().unwrap();
    let response = client.execute(request).await.unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn breaker_opens_after_threshold_and_closes_on_a_successful_probe() {
    CircuitBreakerRegistry::reset();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

    let client = ResilientClient::builder()
        .name("breaker-scenario")
        .circuit_breaker("breaker-scenario", 3, Duration::from_millis(50))
        .build();

    // Each call is a single, unretried attempt (no retrier configured), so
    // three 500 responses are three observed failures for the breaker.
    for _ in 0..3 {
        let request = reqwest::Client::new().get(server.uri()).build().unwrap();
        let result = client.execute(request).await;
        assert!(matches!(result, Err(ClientError::ServerError { status: 500 })));
    }

    // The fourth call observes the breaker open and never reaches the server.
    let before = server.received_requests().await.unwrap().len();
    let request = reqwest::Client::new().get(server.uri()).build().unwrap();
    let result = client.execute(request).await;
    assert!(matches!(result, Err(ClientError::CircuitOpen)));
    assert_eq!(server.received_requests().await.unwrap().len(), before);

    tokio::time::sleep(Duration::from_millis(60)).await;

    // The half-open probe succeeds and closes the breaker.
    let request = reqwest::Client::new().get(server.uri()).build().unwrap();
    let response = client.execute(request).await.unwrap();
    assert_eq!(response.status(), 200);

    let request = reqwest::Client::new().get(server.uri()).build().unwrap();
    let response = client.execute(request).await.unwrap();
    assert_eq!(response.status(), 200);
}
