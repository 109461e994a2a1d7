//! A composable resilience toolkit for Tower/axum services.
//!
//! `tower-resilience` covers both directions of a service boundary. Outbound,
//! a resilient HTTP [`client`] layers retry, a circuit breaker, and a
//! deadline over `reqwest`. Inbound, [`guards`] police each request (rate
//! limiting, body caps, timeouts, IP filtering, CORS, security headers)
//! before it reaches a handler. [`concurrency`] gives structured-concurrency
//! primitives for fanning work out within a request. [`lifecycle`]
//! orchestrates a process's components through a signal-aware shutdown, and
//! [`healthcheck`] aggregates named checks in parallel for a `/healthz`
//! endpoint. Every pattern reports through [`core::error::ServiceError`], a
//! single RFC 9457 Problem Detail error model.
//!
//! Each pattern is available as both an individual crate and as a feature
//! in this meta-crate.
//!
//! # Quick Start
//!
//! ```toml
//! [dependencies]
//! tower-resilience = { version = "0.1", features = ["client", "guards"] }
//! ```
//!
//! # Patterns
//!
//! - **[Circuit Breaker](circuitbreaker)** — stops calling a failing
//!   dependency and gives it time to recover.
//! - **[Retry](retry)** — retries transient failures with exponential
//!   backoff and jitter.
//! - **[Resilient Client](client)** — composes retry, circuit breaker, and a
//!   deadline around outbound HTTP calls.
//! - **[Rate Limiter](ratelimiter)** — token-bucket throttling per caller.
//! - **[Time Limiter](timelimiter)** — bounds how long a handler may run.
//! - **[Guards](guards)** — CORS, IP filtering, body caps, security headers,
//!   request IDs, and panic recovery for inbound requests.
//! - **[Structured Concurrency](concurrency)** — `Map`/`All`/`Race`/`Stream`
//!   fan-out primitives that never silently discard a failure.
//! - **[Lifecycle](lifecycle)** — runs a set of components to completion or
//!   cancellation, tied to OS shutdown signals.
//! - **[Health Aggregator](healthcheck)** — runs named checks in parallel and
//!   renders the joined result as an HTTP or gRPC status.
//!
//! # Pattern Guides
//!
//! ## Circuit Breaker
//!
//! Stops calling a failing service once its failure rate crosses a
//! threshold, and probes it periodically to decide when to resume.
//!
//! ### When to Use
//!
//! - A downstream dependency is failing and retries alone would just pile
//!   up latency against it.
//! - You want to fail fast instead of waiting out a timeout on every call.
//!
//! ### Trade-offs
//!
//! - Tracks recent call outcomes per breaker instance; tune the threshold
//!   and reset timeout to the dependency's actual failure/recovery pattern.
//! - Doesn't retry by itself — pair it with [retry](retry) for transient
//!   failures once the circuit is closed.
//!
//! ### Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "circuitbreaker")]
//! # fn example() {
//! use std::time::Duration;
//! use tower::ServiceBuilder;
//! use tower_resilience::circuitbreaker::CircuitBreakerLayer;
//!
//! let breaker = CircuitBreakerLayer::builder()
//!     .name("payments-api")
//!     .threshold(5)
//!     .reset_timeout(Duration::from_secs(30))
//!     .build();
//!
//! # fn build<S>(inner: S) {
//! let _service = ServiceBuilder::new().layer(breaker).service(inner);
//! # }
//! # }
//! ```
//!
//! ## Retry
//!
//! Retries a single outbound call: network errors and 5xx responses are
//! retried with exponential backoff and jitter, 4xx responses are returned
//! immediately, and a cancelled token aborts both an in-flight attempt and
//! any pending backoff sleep.
//!
//! ### Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "retry")]
//! # async fn example() {
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use tower_resilience::retry::{Attempt, Retrier, RetrierConfig};
//!
//! let retrier = Retrier::new(RetrierConfig::new(3, Duration::from_millis(100)).name("payments-api"));
//! let (response, error) = retrier
//!     .execute::<&str, &str, _, _, _, _>(
//!         &CancellationToken::new(),
//!         |_attempt| async { Attempt::Responded { response: "ok", status: 200 } },
//!         |_dropped_response| async {},
//!     )
//!     .await;
//! # let _ = (response, error);
//! # }
//! ```
//!
//! ## Resilient Client
//!
//! Wraps `reqwest` with a deadline, a circuit breaker keyed by name, and a
//! retrier, and cancels the in-flight request's internal deadline only when
//! the response body is dropped — not when the call returns — so streaming
//! callers get the full body.
//!
//! ### Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "client")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use std::time::Duration;
//! use tower_resilience::client::ResilientClient;
//!
//! let client = ResilientClient::builder()
//!     .name("payments-api")
//!     .timeout(Duration::from_secs(5))
//!     .circuit_breaker("payments-api", 5, Duration::from_secs(30))
//!     .build();
//!
//! let request = reqwest::Client::new().get("https://example.com/health").build()?;
//! let response = client.execute(request).await?;
//! let body = response.text().await?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```
//!
//! ## Rate Limiter
//!
//! Token-bucket throttling keyed by remote address, a trusted
//! `X-Forwarded-For` hop, or a custom header; rejects over the limit with
//! `429` and a `Retry-After` header.
//!
//! ### Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "ratelimiter")]
//! # fn example() {
//! use axum::body::Body;
//! use std::time::Duration;
//! use tower_resilience::ratelimiter::{RateLimiterConfig, RateLimiterLayer};
//!
//! let config = RateLimiterConfig::<Body>::builder()
//!     .rate(50.0)
//!     .window(Duration::from_secs(1))
//!     .build()
//!     .expect("valid configuration");
//! let limiter = RateLimiterLayer::new(config);
//! # let _ = limiter;
//! # }
//! ```
//!
//! ## Guards
//!
//! Each guard is a `Handler -> Handler` transformer, so they compose in any
//! order. See [`guards`] for the full set: [`guards::CorsLayer`],
//! [`guards::IpFilterLayer`], [`guards::MaxBodyLayer`],
//! [`guards::SecurityHeadersLayer`], [`guards::RequestIdLayer`], and
//! [`guards::RecoveryLayer`].
//!
//! ### Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "guards")]
//! # fn example() {
//! use tower::ServiceBuilder;
//! use tower_resilience::guards::security_headers::SecurityHeadersConfig;
//! use tower_resilience::guards::{RecoveryLayer, RequestIdLayer, SecurityHeadersLayer};
//!
//! # fn build<S>(inner: S) {
//! let _service = ServiceBuilder::new()
//!     .layer(RecoveryLayer::new("edge"))
//!     .layer(RequestIdLayer)
//!     .layer(SecurityHeadersLayer::new(SecurityHeadersConfig::recommended()))
//!     .service(inner);
//! # }
//! # }
//! ```
//!
//! ## Structured Concurrency
//!
//! `Map` runs a function over a list of items with bounded concurrency and
//! returns results aligned with the input order; `All`, `Race`, and `Stream`
//! cover the other common fan-out shapes. None of them discard a failure:
//! every failing item is represented in the returned [`concurrency::Errors`].
//!
//! ### Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "concurrency")]
//! # async fn example() {
//! use tower_resilience::concurrency::{map, Workers};
//!
//! let ids = vec![1, 2, 3];
//! let (results, errors) = map(ids, Workers::new(4), |id| async move {
//!     Ok::<_, std::convert::Infallible>(id * 2)
//! })
//! .await;
//! assert!(errors.is_none());
//! assert_eq!(results, vec![Some(2), Some(4), Some(6)]);
//! # }
//! ```
//!
//! ## Lifecycle
//!
//! Runs a fixed set of components to completion, cancelling the rest as soon
//! as one exits in error or a termination signal arrives, and waits for
//! every component to actually stop before returning.
//!
//! ## Health Aggregator
//!
//! Runs every named check in parallel (built on [`concurrency::map`]) and
//! renders the joined outcome as 200/503 over HTTP or SERVING/NOT_SERVING
//! over gRPC.
//!
//! ### Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "healthcheck")]
//! # async fn example() {
//! use tower_resilience::healthcheck::HealthAggregator;
//!
//! let aggregator = HealthAggregator::builder()
//!     .check("database", || async { Ok(()) })
//!     .build();
//!
//! let report = aggregator.run().await;
//! assert!(report.healthy());
//! # }
//! ```

pub use tower_resilience_core as core;

#[cfg(feature = "circuitbreaker")]
pub use tower_resilience_circuitbreaker as circuitbreaker;

#[cfg(feature = "client")]
pub use tower_resilience_client as client;

#[cfg(feature = "concurrency")]
pub use tower_resilience_concurrency as concurrency;

#[cfg(feature = "guards")]
pub use tower_resilience_guards as guards;

#[cfg(feature = "healthcheck")]
pub use tower_resilience_healthcheck as healthcheck;

#[cfg(feature = "lifecycle")]
pub use tower_resilience_lifecycle as lifecycle;

#[cfg(feature = "ratelimiter")]
pub use tower_resilience_ratelimiter as ratelimiter;

#[cfg(feature = "retry")]
pub use tower_resilience_retry as retry;

#[cfg(feature = "timelimiter")]
pub use tower_resilience_timelimiter as timelimiter;
