//! The circuit breaker state machine and its process-wide named registry.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "metrics")]
use metrics::counter;

use tower_resilience_core::events::EventListeners;

use crate::error::CircuitOpenError;
use crate::events::CircuitBreakerEvent;

/// The state of a [`CircuitBreaker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CircuitState {
    /// Calls are allowed through; consecutive failures are being counted.
    Closed = 0,
    /// Calls are rejected without invoking the transport.
    Open = 1,
    /// A limited probe period: calls are allowed through to test recovery.
    HalfOpen = 2,
}

impl CircuitState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            _ => CircuitState::HalfOpen,
        }
    }
}

struct Inner {
    state: AtomicU8,
    consecutive_failures: Mutex<u32>,
    last_failure: Mutex<Option<Instant>>,
}

/// A named circuit breaker implementing the consecutive-failure threshold
/// state machine: `Closed` moves to `Open` exactly when the consecutive
/// failure counter reaches `threshold`; `Open` moves to `HalfOpen` only when
/// an `allow()` call observes `now - last_failure >= reset_timeout`;
/// `HalfOpen` moves to `Closed` on the next success or back to `Open` on the
/// next failure.
///
/// All state transitions for a given breaker are serialized by that
/// breaker's own internal lock; the single-threaded transition table in the
/// type's documentation holds even under concurrent callers. `HalfOpen`
/// deliberately admits multiple concurrent probes rather than gating on a
/// single in-flight probe — see the crate-level docs.
pub struct CircuitBreaker {
    name: String,
    threshold: u32,
    reset_timeout: Duration,
    inner: Inner,
    events: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreaker {
    fn new(name: String, threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            name,
            threshold: threshold.max(1),
            reset_timeout,
            inner: Inner {
                state: AtomicU8::new(CircuitState::Closed as u8),
                consecutive_failures: Mutex::new(0),
                last_failure: Mutex::new(None),
            },
            events: EventListeners::new(),
        }
    }

    /// This breaker's registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current state. May be stale the instant it's read under
    /// concurrent callers, same as any lock-free snapshot.
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    /// Registers an event listener observing this breaker's transitions.
    ///
    /// Because breakers are singletons by name, listeners added on a
    /// *first* registration observe every subsequent caller's traffic too.
    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: tower_resilience_core::EventListener<CircuitBreakerEvent> + 'static,
    {
        self.events.add(listener);
    }

    /// Returns `Ok(())` if a call may proceed, or [`CircuitOpenError`] if it
    /// must be rejected without invoking the transport.
    ///
    /// In `Open`, this is also where the `Open -> HalfOpen` transition
    /// happens: the *first* `allow()` call observed after `reset_timeout`
    /// has elapsed flips the breaker to `HalfOpen` and proceeds.
    pub fn allow(&self) -> Result<(), CircuitOpenError> {
        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let elapsed = {
                    let last_failure = self.inner.last_failure.lock().unwrap();
                    last_failure.map(|t| t.elapsed()).unwrap_or(Duration::MAX)
                };
                if elapsed >= self.reset_timeout {
                    self.transition_to(CircuitState::HalfOpen);
                    Ok(())
                } else {
                    #[cfg(feature = "metrics")]
                    counter!("circuit_breaker_calls_rejected_total", "breaker" => self.name.clone())
                        .increment(1);
                    self.events.emit(&CircuitBreakerEvent::CallRejected {
                        name: self.name.clone(),
                        timestamp: Instant::now(),
                    });
                    Err(CircuitOpenError)
                }
            }
        }
    }

    /// Records the outcome of a call permitted by [`Self::allow`].
    pub fn record(&self, success: bool) {
        match self.state() {
            CircuitState::Closed => {
                if success {
                    *self.inner.consecutive_failures.lock().unwrap() = 0;
                } else {
                    let mut failures = self.inner.consecutive_failures.lock().unwrap();
                    *failures += 1;
                    *self.inner.last_failure.lock().unwrap() = Some(Instant::now());
                    if *failures >= self.threshold {
                        drop(failures);
                        self.transition_to(CircuitState::Open);
                    }
                }
            }
            CircuitState::HalfOpen => {
                if success {
                    *self.inner.consecutive_failures.lock().unwrap() = 0;
                    self.transition_to(CircuitState::Closed);
                } else {
                    *self.inner.last_failure.lock().unwrap() = Some(Instant::now());
                    self.transition_to(CircuitState::Open);
                }
            }
            CircuitState::Open => {
                // Record is a no-op while Open; nothing was permitted through.
            }
        }
    }

    fn transition_to(&self, to: CircuitState) {
        let from = self.state();
        if from == to {
            return;
        }
        self.inner.state.store(to as u8, Ordering::SeqCst);

        #[cfg(feature = "tracing")]
        tracing::info!(breaker = %self.name, ?from, ?to, "circuit breaker state transition");

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuit_breaker_state_transitions_total",
                "breaker" => self.name.clone(),
                "to" => format!("{to:?}")
            )
            .increment(1);
        }

        self.events.emit(&CircuitBreakerEvent::StateTransition {
            name: self.name.clone(),
            from,
            to,
            timestamp: Instant::now(),
        });
    }
}

/// The process-wide, keyed-singleton breaker registry.
///
/// `get_or_init(name, ...)` converges concurrent first-callers on exactly
/// one instance for a given name; a name that is already registered ignores
/// the threshold/reset_timeout arguments of later callers entirely — this is
/// a deliberate simplicity/reconfigurability trade-off (see `DESIGN.md`).
pub struct CircuitBreakerRegistry;

fn registry() -> &'static Mutex<HashMap<String, Arc<CircuitBreaker>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, Arc<CircuitBreaker>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

impl CircuitBreakerRegistry {
    /// Returns the breaker registered under `name`, creating it with
    /// `threshold`/`reset_timeout` if this is the first call for that name.
    pub fn get_or_init(name: &str, threshold: u32, reset_timeout: Duration) -> Arc<CircuitBreaker> {
        let mut guard = registry().lock().unwrap();
        guard
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name.to_string(), threshold, reset_timeout)))
            .clone()
    }

    /// Test-only: clears every registered breaker so tests don't leak shared
    /// singleton state into each other. Not meant for production use.
    pub fn reset() {
        registry().lock().unwrap().clear();
    }
}
