//! Configuration and builder for [`crate::ResilientClient`].

use std::sync::Arc;
use std::time::Duration;

use tower_resilience_circuitbreaker::{CircuitBreaker, CircuitBreakerRegistry};
use tower_resilience_core::events::{EventListeners, FnListener};
use tower_resilience_retry::{Retrier, RetrierConfig};
use tower_resilience_concurrency::Workers;

use crate::client::ResilientClient;
use crate::events::ClientEvent;

/// Resolved configuration shared by a [`ResilientClient`] instance.
pub(crate) struct ClientConfig {
    pub(crate) name: String,
    pub(crate) timeout: Duration,
    /// Always present: a caller who didn't configure retries gets a
    /// single-attempt retrier, so status-based success (§4.4 step 4, "err ==
    /// nil && status < 500") is decided in exactly one place regardless.
    pub(crate) retrier: Retrier,
    pub(crate) breaker: Option<Arc<CircuitBreaker>>,
    pub(crate) workers: Workers,
    pub(crate) http: reqwest::Client,
    pub(crate) events: EventListeners<ClientEvent>,
}

/// Builds a [`ResilientClient`].
pub struct ResilientClientConfigBuilder {
    name: String,
    timeout: Duration,
    retry: Option<RetrierConfig>,
    breaker: Option<(String, u32, Duration)>,
    workers: Workers,
    http: Option<reqwest::Client>,
    events: EventListeners<ClientEvent>,
}

impl ResilientClientConfigBuilder {
    pub(crate) fn new() -> Self {
        Self {
            name: "<unnamed>".to_string(),
            timeout: Duration::from_secs(10),
            retry: None,
            breaker: None,
            workers: Workers::default(),
            http: None,
            events: EventListeners::new(),
        }
    }

    /// Sets the name used in emitted events and, if a breaker is enabled,
    /// as its registry key.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the deadline applied to a call when the caller supplies none.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables retrying failed attempts per `config`.
    pub fn retry(mut self, config: RetrierConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Enables circuit breaking, gating calls through the process-wide
    /// breaker registered under `name`.
    pub fn circuit_breaker(mut self, name: impl Into<String>, threshold: u32, reset_timeout: Duration) -> Self {
        self.breaker = Some((name.into(), threshold, reset_timeout));
        self
    }

    /// Bounds the concurrency of [`ResilientClient::batch`].
    pub fn workers(mut self, workers: Workers) -> Self {
        self.workers = workers;
        self
    }

    /// Supplies the underlying [`reqwest::Client`] instead of a default one.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Registers a callback observing this client's lifecycle events.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        self.events.add(FnListener::new(f));
        self
    }

    /// Builds the client.
    pub fn build(self) -> ResilientClient {
        let breaker = self
            .breaker
            .map(|(name, threshold, reset_timeout)| CircuitBreakerRegistry::get_or_init(&name, threshold, reset_timeout));
        let retrier = Retrier::new(self.retry.unwrap_or_else(|| RetrierConfig::new(1, Duration::from_millis(100))));

        ResilientClient::from_config(ClientConfig {
            name: self.name,
            timeout: self.timeout,
            retrier,
            breaker,
            workers: self.workers,
            http: self.http.unwrap_or_default(),
            events: self.events,
        })
    }
}

impl Default for ResilientClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
