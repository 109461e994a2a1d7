//! The resilient HTTP client itself (§4.4): deadline, breaker, and retrier
//! composed around a [`reqwest::Client`].

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Request, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use tower_resilience_concurrency::{map, Errors};
use tower_resilience_retry::Attempt;

use crate::config::{ClientConfig, ResilientClientConfigBuilder};
use crate::error::ClientError;
use crate::events::ClientEvent;

/// Cancels its token when dropped. Attached to a [`ResilientResponse`] when
/// the call that produced it created its own deadline context, so that
/// context stays alive until the caller is done with the body (§4.4 step 5).
struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// A response returned by [`ResilientClient::execute`].
///
/// Behaves like [`reqwest::Response`] for reading the body, but carries the
/// deadline context's lifetime: dropping it (or consuming the body to
/// completion) releases a deadline this call created for itself. A deadline
/// the caller supplied via [`ResilientClient::execute_with_deadline`] is left
/// untouched — the caller owns that lifetime.
pub struct ResilientResponse {
    inner: reqwest::Response,
    _guard: Option<CancelOnDrop>,
}

impl ResilientResponse {
    fn new(inner: reqwest::Response, owned_deadline: Option<CancellationToken>) -> Self {
        Self {
            inner,
            _guard: owned_deadline.map(CancelOnDrop),
        }
    }

    /// This response's HTTP status.
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// This response's headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Consumes the response, returning the raw body bytes.
    pub async fn bytes(self) -> Result<Bytes, ClientError> {
        self.inner.bytes().await.map_err(ClientError::Transport)
    }

    /// Consumes the response, returning the body decoded as UTF-8 text.
    pub async fn text(self) -> Result<String, ClientError> {
        self.inner.text().await.map_err(ClientError::Transport)
    }

    /// Consumes the response, deserializing the body as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        self.inner.json().await.map_err(ClientError::Transport)
    }

    /// Unwraps the underlying [`reqwest::Response`], discarding the
    /// cancel-on-drop guard. The caller takes over the deadline context's
    /// lifetime, if this call created one.
    pub fn into_inner(self) -> reqwest::Response {
        self.inner
    }
}

/// A resilient HTTP client composing a deadline, an optional circuit
/// breaker, and an optional retrier around [`reqwest::Client`] (§4.4).
///
/// ```
/// use tower_resilience_client::ResilientClient;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ResilientClient::builder()
///     .name("payments-api")
///     .timeout(Duration::from_secs(5))
///     .circuit_breaker("payments-api", 5, Duration::from_secs(30))
///     .build();
///
/// let request = reqwest::Client::new().get("https://example.com").build()?;
/// let response = client.execute(request).await?;
/// println!("{}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ResilientClient {
    config: Arc<ClientConfig>,
}

impl ResilientClient {
    pub(crate) fn from_config(config: ClientConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Starts a new builder.
    pub fn builder() -> ResilientClientConfigBuilder {
        ResilientClientConfigBuilder::new()
    }

    /// Executes `request` under a deadline this client manages: if it
    /// elapses before a response is received, the call fails with
    /// [`ClientError::Timeout`].
    pub async fn execute(&self, request: Request) -> Result<ResilientResponse, ClientError> {
        self.execute_with_deadline(request, None).await
    }

    /// Executes `request` under `deadline` instead of one this client
    /// creates. The caller retains ownership of that token's lifetime; the
    /// returned [`ResilientResponse`] carries no cancel-on-drop guard.
    pub async fn execute_with_deadline(
        &self,
        request: Request,
        deadline: Option<CancellationToken>,
    ) -> Result<ResilientResponse, ClientError> {
        let created_here = deadline.is_none();
        let cancel = deadline.unwrap_or_default();

        if created_here {
            let timer_token = cancel.clone();
            let timeout = self.config.timeout;
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(timeout) => timer_token.cancel(),
                    _ = timer_token.cancelled() => {}
                }
            });
        }

        if let Some(breaker) = &self.config.breaker {
            if breaker.allow().is_err() {
                if created_here {
                    cancel.cancel();
                }
                self.config.events.emit(&ClientEvent::CircuitRejected {
                    pattern_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                });
                return Err(ClientError::CircuitOpen);
            }
        }

        let method = request.method().clone();
        let url = request.url().clone();
        let headers = request.headers().clone();
        let original = request;
        let http = &self.config.http;
        let last_status = AtomicU16::new(0);

        let build_attempt = |_attempt: u32| -> Request {
            original.try_clone().unwrap_or_else(|| {
                let mut fallback = Request::new(method.clone(), url.clone());
                *fallback.headers_mut() = headers.clone();
                fallback
            })
        };

        let run_once = |attempt: u32| {
            let request = build_attempt(attempt);
            let cancel = cancel.clone();
            let last_status = &last_status;
            async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Attempt::NetworkError(ClientError::Timeout),
                    result = http.execute(request) => match result {
                        Ok(response) => {
                            let status = response.status().as_u16();
                            Attempt::Responded { response, status }
                        }
                        Err(err) => Attempt::NetworkError(ClientError::Transport(err)),
                    },
                };
                if let Attempt::Responded { status, .. } = &outcome {
                    last_status.store(*status, Ordering::SeqCst);
                }
                outcome
            }
        };

        let (response, error) = self
            .config
            .retrier
            .execute(&cancel, run_once, |response| async move {
                let _ = response.bytes().await;
            })
            .await;

        let success = response.is_some();
        if let Some(breaker) = &self.config.breaker {
            breaker.record(success);
        }

        match response {
            Some(response) => {
                let status = response.status().as_u16();
                self.config.events.emit(&ClientEvent::Succeeded {
                    pattern_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    status,
                });
                Ok(ResilientResponse::new(response, created_here.then_some(cancel)))
            }
            None => {
                self.config.events.emit(&ClientEvent::Failed {
                    pattern_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                });
                if created_here {
                    cancel.cancel();
                }
                Err(error.unwrap_or(ClientError::ServerError {
                    status: last_status.load(Ordering::SeqCst),
                }))
            }
        }
    }

    /// Executes every request in `requests` concurrently, bounded to the
    /// configured worker count, preserving input order (§4.4 step 6).
    pub async fn batch(&self, requests: Vec<Request>) -> (Vec<Option<ResilientResponse>>, Option<Errors>) {
        let client = self.clone();
        map(requests, self.config.workers, move |request| {
            let client = client.clone();
            async move { client.execute(request).await }
        })
        .await
    }
}
