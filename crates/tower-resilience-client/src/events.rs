//! Observability events emitted by [`crate::ResilientClient`].

use std::time::Instant;

use tower_resilience_core::events::ResilienceEvent;

/// Lifecycle events for a resilient HTTP call.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The call completed with a non-server-error status.
    Succeeded {
        /// The client's configured name.
        pattern_name: String,
        /// When the call completed.
        timestamp: Instant,
        /// The final HTTP status.
        status: u16,
    },
    /// Every attempt was exhausted without a usable response.
    Failed {
        /// The client's configured name.
        pattern_name: String,
        /// When the call gave up.
        timestamp: Instant,
    },
    /// The circuit breaker rejected the call before the transport ran.
    CircuitRejected {
        /// The client's configured name.
        pattern_name: String,
        /// When the rejection occurred.
        timestamp: Instant,
    },
}

impl ResilienceEvent for ClientEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::Succeeded { .. } => "succeeded",
            ClientEvent::Failed { .. } => "failed",
            ClientEvent::CircuitRejected { .. } => "circuit_rejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ClientEvent::Succeeded { timestamp, .. }
            | ClientEvent::Failed { timestamp, .. }
            | ClientEvent::CircuitRejected { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            ClientEvent::Succeeded { pattern_name, .. }
            | ClientEvent::Failed { pattern_name, .. }
            | ClientEvent::CircuitRejected { pattern_name, .. } => pattern_name,
        }
    }
}
