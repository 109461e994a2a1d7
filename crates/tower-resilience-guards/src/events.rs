//! Observability events emitted by the inbound guards.

use std::time::Instant;

use tower_resilience_core::events::ResilienceEvent;

/// Events emitted by [`crate::cors`], [`crate::ip_filter`], [`crate::max_body`],
/// and [`crate::recovery`] as they admit or reject requests.
#[derive(Debug, Clone)]
pub enum GuardEvent {
    /// A request was rejected by a guard before reaching the inner service.
    Rejected {
        /// The guard instance's name.
        pattern_name: String,
        /// When the rejection happened.
        timestamp: Instant,
        /// Short machine-readable reason (e.g. `"origin_denied"`, `"ip_denied"`).
        reason: &'static str,
    },
    /// The inner handler panicked and [`crate::recovery`] substituted a 500.
    PanicRecovered {
        /// The guard instance's name.
        pattern_name: String,
        /// When the panic was caught.
        timestamp: Instant,
        /// The panic payload, stringified.
        message: String,
    },
}

impl ResilienceEvent for GuardEvent {
    fn event_type(&self) -> &'static str {
        match self {
            GuardEvent::Rejected { .. } => "rejected",
            GuardEvent::PanicRecovered { .. } => "panic_recovered",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            GuardEvent::Rejected { timestamp, .. } => *timestamp,
            GuardEvent::PanicRecovered { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            GuardEvent::Rejected { pattern_name, .. } => pattern_name,
            GuardEvent::PanicRecovered { pattern_name, .. } => pattern_name,
        }
    }
}
