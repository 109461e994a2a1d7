//! Context-aware retry for a single outbound HTTP attempt.
//!
//! [`Retrier`] is shaped around a single logical call, not an arbitrary
//! Tower `Service`: it inspects the response status to decide whether to
//! retry, drains and drops the body of any response it discards, and backs
//! off with jitter between attempts. It is the retry engine behind
//! [`tower_resilience_client`](https://docs.rs/tower-resilience-client) and
//! is generic over the response and error types so it can drive any
//! transport, not only a particular HTTP client.

use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::events::RetryEvent;
use tower_resilience_core::events::EventListeners;

/// Configuration for a [`Retrier`].
#[derive(Clone)]
pub struct RetrierConfig {
    pub(crate) max_attempts: u32,
    pub(crate) base_delay: Duration,
    pub(crate) name: String,
}

impl RetrierConfig {
    /// Creates a configuration. `max_attempts` is clamped to at least 1; a
    /// zero `base_delay` is replaced with 100ms.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: if base_delay.is_zero() {
                Duration::from_millis(100)
            } else {
                base_delay
            },
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the name used in emitted events.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Default for RetrierConfig {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

/// Outcome of a call attempt, used to decide whether to retry.
///
/// Generic over the response and error types so the retrier can drive any
/// transport, not a specific HTTP client crate.
pub enum Attempt<R, E> {
    /// The call returned a response with the given HTTP status code.
    Responded { response: R, status: u16 },
    /// The call failed at the transport level (connection, DNS, TLS, ...).
    NetworkError(E),
}

/// Retries a single logical HTTP call using exponential backoff with
/// jitter, honoring cancellation and the response status rules from §4.3:
/// network errors and 5xx responses are retried, 4xx responses are not.
pub struct Retrier {
    config: RetrierConfig,
    events: EventListeners<RetryEvent>,
}

impl Retrier {
    /// Creates a retrier from the given configuration.
    pub fn new(config: RetrierConfig) -> Self {
        Self {
            config,
            events: EventListeners::new(),
        }
    }

    /// Registers a listener observing retry lifecycle events.
    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: tower_resilience_core::events::EventListener<RetryEvent> + 'static,
    {
        self.events.add(listener);
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2f64.powi(attempt as i32);
        let scaled = self.config.base_delay.as_secs_f64() * factor;
        let delay = Duration::from_secs_f64(scaled);
        let half = delay / 2;
        let jitter = if half.is_zero() {
            Duration::ZERO
        } else {
            rand::rng().random_range(Duration::ZERO..half)
        };
        delay + jitter
    }

    /// Runs `op` up to `max_attempts` times, retrying on network errors and
    /// 5xx statuses, and returns the last observed `(response, error)` pair.
    ///
    /// `op` is invoked once per attempt and should perform the HTTP call
    /// fresh each time; the caller is responsible for body rewindability
    /// (§4.3 caveat) — a non-rewindable body should be re-supplied empty on
    /// retry, not silently replayed.
    ///
    /// `drain` is called on any response this retrier decides to discard,
    /// so the caller can release transport resources (read the body to
    /// completion, drop the handle) before the next attempt starts.
    pub async fn execute<R, E, Op, Fut, Drain, DrainFut>(
        &self,
        cancel: &CancellationToken,
        mut op: Op,
        mut drain: Drain,
    ) -> (Option<R>, Option<E>)
    where
        Op: FnMut(u32) -> Fut,
        Fut: std::future::Future<Output = Attempt<R, E>>,
        Drain: FnMut(R) -> DrainFut,
        DrainFut: std::future::Future<Output = ()>,
        E: std::fmt::Debug,
    {
        let mut last_response: Option<R> = None;
        let mut last_error: Option<E> = None;

        for attempt in 0..self.config.max_attempts {
            if cancel.is_cancelled() {
                break;
            }

            match op(attempt).await {
                Attempt::Responded { response, status } if status < 500 => {
                    self.events.emit(&RetryEvent::Success {
                        pattern_name: self.config.name.clone(),
                        timestamp: std::time::Instant::now(),
                        attempts: attempt as usize + 1,
                    });
                    return (Some(response), None);
                }
                Attempt::Responded { response, status: _ } => {
                    drain(response).await;
                    last_response = None;
                    last_error = None;
                }
                Attempt::NetworkError(err) => {
                    last_error = Some(err);
                    last_response = None;
                }
            }

            let is_last_attempt = attempt + 1 >= self.config.max_attempts;
            if is_last_attempt {
                self.events.emit(&RetryEvent::Error {
                    pattern_name: self.config.name.clone(),
                    timestamp: std::time::Instant::now(),
                    attempts: attempt as usize + 1,
                });
                break;
            }

            let delay = self.backoff(attempt);
            self.events.emit(&RetryEvent::Retry {
                pattern_name: self.config.name.clone(),
                timestamp: std::time::Instant::now(),
                attempt: attempt as usize,
                delay,
            });

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => break,
            }
        }

        (last_response, last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn succeeds_without_retry_on_2xx() {
        let retrier = Retrier::new(RetrierConfig::new(3, Duration::from_millis(1)));
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);

        let (response, error) = retrier
            .execute::<&str, &str, _, _, _, _>(
                &CancellationToken::new(),
                move |_attempt| {
                    c.fetch_add(1, Ordering::SeqCst);
                    async { Attempt::Responded { response: "ok", status: 200 } }
                },
                |_resp| async {},
            )
            .await;

        assert_eq!(response, Some("ok"));
        assert!(error.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_retry_on_4xx() {
        let retrier = Retrier::new(RetrierConfig::new(3, Duration::from_millis(1)));
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);

        let (response, _error) = retrier
            .execute::<&str, &str, _, _, _, _>(
                &CancellationToken::new(),
                move |_attempt| {
                    c.fetch_add(1, Ordering::SeqCst);
                    async { Attempt::Responded { response: "bad request", status: 400 } }
                },
                |_resp| async {},
            )
            .await;

        assert!(response.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_on_5xx_then_succeeds() {
        let retrier = Retrier::new(RetrierConfig::new(3, Duration::from_millis(1)));
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let drained = Arc::new(AtomicU32::new(0));
        let d = Arc::clone(&drained);

        let (response, error) = retrier
            .execute::<&str, &str, _, _, _, _>(
                &CancellationToken::new(),
                move |attempt| {
                    c.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt < 2 {
                            Attempt::Responded { response: "server error", status: 503 }
                        } else {
                            Attempt::Responded { response: "ok", status: 200 }
                        }
                    }
                },
                move |_resp| {
                    d.fetch_add(1, Ordering::SeqCst);
                    async {}
                },
            )
            .await;

        assert_eq!(response, Some("ok"));
        assert!(error.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(drained.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhausts_attempts_on_persistent_network_error() {
        let retrier = Retrier::new(RetrierConfig::new(3, Duration::from_millis(1)));
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);

        let (response, error) = retrier
            .execute::<&str, &str, _, _, _, _>(
                &CancellationToken::new(),
                move |_attempt| {
                    c.fetch_add(1, Ordering::SeqCst);
                    async { Attempt::NetworkError("connection refused") }
                },
                |_resp| async {},
            )
            .await;

        assert!(response.is_none());
        assert_eq!(error, Some("connection refused"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_aborts_backoff() {
        let retrier = Retrier::new(RetrierConfig::new(5, Duration::from_secs(10)));
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            retrier
                .execute::<&str, &str, _, _, _, _>(
                    &token,
                    move |_attempt| {
                        c.fetch_add(1, Ordering::SeqCst);
                        async { Attempt::NetworkError("boom") }
                    },
                    |_resp| async {},
                )
                .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        let (response, _error) = handle.await.unwrap();
        assert!(response.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
