//! A resilient HTTP client composing a deadline, circuit breaker, and
//! retrier around [`reqwest`] (§4.4).
//!
//! [`ResilientClient::execute`] runs a single call through, in order: an
//! implicit deadline (created when the caller supplies none), an optional
//! named [`tower_resilience_circuitbreaker::CircuitBreaker`] gate, and an
//! optional [`tower_resilience_retry::Retrier`] that retries network errors
//! and 5xx responses with jittered backoff. [`ResilientClient::batch`] runs
//! many requests concurrently via [`tower_resilience_concurrency::map`],
//! bounded to the configured worker count and preserving input order.
//!
//! ## Feature flags
//! - `metrics`: cascades into the underlying retrier/breaker crates' metrics
//! - `tracing`: cascades into the underlying retrier/breaker crates' tracing

mod client;
mod config;
mod error;
mod events;

pub use client::{ResilientClient, ResilientResponse};
pub use config::ResilientClientConfigBuilder;
pub use error::ClientError;
pub use events::ClientEvent;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tower_resilience_circuitbreaker::CircuitBreakerRegistry;
    use tower_resilience_retry::RetrierConfig;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn succeeds_against_a_healthy_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let client = ResilientClient::builder()
            .timeout(Duration::from_secs(5))
            .build();

        let request = reqwest::Client::new().get(server.uri()).build().unwrap();
        let response = client.execute(request).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn retries_a_500_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
            .mount(&server)
            .await;

        let client = ResilientClient::builder()
            .timeout(Duration::from_secs(5))
            .retry(RetrierConfig::new(3, Duration::from_millis(1)))
            .build();

        let request = reqwest::Client::new().get(server.uri()).build().unwrap();
        let response = client.execute(request).await.unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn open_breaker_rejects_without_calling_the_transport() {
        CircuitBreakerRegistry::reset();
        CircuitBreakerRegistry::get_or_init("client-test-open", 1, Duration::from_secs(30)).record(false);

        // No mock is mounted: the breaker must reject before the transport
        // ever reaches the server, so an unmatched request would panic.
        let server = MockServer::start().await;

        let client = ResilientClient::builder()
            .circuit_breaker("client-test-open", 1, Duration::from_secs(30))
            .build();

        let request = reqwest::Client::new().get(server.uri()).build().unwrap();
        let result = client.execute(request).await;
        assert!(matches!(result, Err(ClientError::CircuitOpen)));
    }

    #[tokio::test]
    async fn breaker_opens_after_consecutive_server_errors() {
        CircuitBreakerRegistry::reset();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = ResilientClient::builder()
            .circuit_breaker("client-test-trip", 1, Duration::from_secs(30))
            .build();

        let request = reqwest::Client::new().get(server.uri()).build().unwrap();
        let first = client.execute(request).await;
        assert!(matches!(first, Err(ClientError::ServerError { status: 500 })));

        let request = reqwest::Client::new().get(server.uri()).build().unwrap();
        let second = client.execute(request).await;
        assert!(matches!(second, Err(ClientError::CircuitOpen)));
    }

    #[tokio::test]
    async fn batch_preserves_order_and_reports_per_item_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let client = ResilientClient::builder().build();
        let healthy = reqwest::Client::new().get(server.uri()).build().unwrap();
        let broken = reqwest::Client::new().get("http://127.0.0.1:1").build().unwrap();

        let (results, errors) = client.batch(vec![healthy, broken]).await;
        assert!(results[0].is_some());
        assert!(results[1].is_none());
        assert!(errors.is_some());
        assert_eq!(errors.unwrap().len(), 1);
    }
}
