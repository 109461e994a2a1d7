//! Events emitted by the lifecycle orchestrator.

use std::time::Instant;

use tower_resilience_core::events::ResilienceEvent;

/// Lifecycle-wide events observable during a [`crate::run`] call.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// An OS termination signal (SIGTERM/SIGINT or equivalent) was
    /// received and the run's context has been cancelled.
    SignalReceived { timestamp: Instant, signal: &'static str },
    /// A component returned, successfully or not. If this is the first
    /// failing component, its error cancelled the shared context.
    ComponentExited {
        timestamp: Instant,
        name: String,
        failed: bool,
    },
}

impl ResilienceEvent for LifecycleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LifecycleEvent::SignalReceived { .. } => "signal_received",
            LifecycleEvent::ComponentExited { .. } => "component_exited",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            LifecycleEvent::SignalReceived { timestamp, .. } => *timestamp,
            LifecycleEvent::ComponentExited { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            LifecycleEvent::SignalReceived { .. } => "lifecycle",
            LifecycleEvent::ComponentExited { name, .. } => name,
        }
    }
}
