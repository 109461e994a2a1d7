//! Observability events emitted by a [`crate::CircuitBreaker`].

use std::time::Instant;
use tower_resilience_core::ResilienceEvent;

use crate::circuit::CircuitState;

/// Events emitted by a circuit breaker as it transitions state or records calls.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// The breaker moved from one state to another.
    StateTransition {
        /// Breaker name.
        name: String,
        /// State before the transition.
        from: CircuitState,
        /// State after the transition.
        to: CircuitState,
        /// When the transition occurred.
        timestamp: Instant,
    },
    /// A call was rejected because the breaker was open.
    CallRejected {
        /// Breaker name.
        name: String,
        /// When the rejection occurred.
        timestamp: Instant,
    },
}

impl ResilienceEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { timestamp, .. } => *timestamp,
            CircuitBreakerEvent::CallRejected { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { name, .. } => name,
            CircuitBreakerEvent::CallRejected { name, .. } => name,
        }
    }
}
