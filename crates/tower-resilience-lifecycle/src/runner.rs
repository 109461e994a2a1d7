//! `Lifecycle::run` — the orchestrator itself.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower_resilience_core::events::{EventListeners, FnListener};

use crate::component::Component;
use crate::error::ComponentError;
use crate::events::LifecycleEvent;
use crate::signal::termination_signal;

#[cfg(feature = "metrics")]
use metrics::counter;

/// Configuration for a [`Lifecycle`], built via [`Lifecycle::builder`].
struct LifecycleConfig {
    event_listeners: EventListeners<LifecycleEvent>,
}

/// Builder for [`Lifecycle`].
pub struct LifecycleConfigBuilder {
    event_listeners: EventListeners<LifecycleEvent>,
}

impl LifecycleConfigBuilder {
    fn new() -> Self {
        Self {
            event_listeners: EventListeners::new(),
        }
    }

    /// Registers a callback fired whenever a component returns.
    pub fn on_component_exited<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, bool) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &LifecycleEvent| {
            if let LifecycleEvent::ComponentExited { name, failed, .. } = event {
                f(name, *failed);
            }
        }));
        self
    }

    /// Registers a callback fired when a termination signal cancels the run.
    pub fn on_signal<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &LifecycleEvent| {
            if let LifecycleEvent::SignalReceived { signal, .. } = event {
                f(signal);
            }
        }));
        self
    }

    /// Builds the orchestrator.
    pub fn build(self) -> Lifecycle {
        Lifecycle {
            config: Arc::new(LifecycleConfig {
                event_listeners: self.event_listeners,
            }),
        }
    }
}

impl Default for LifecycleConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Orchestrates a set of long-running components sharing one cancellable
/// lifetime (§4.9).
///
/// `run` derives a child of the caller's [`CancellationToken`] that
/// additionally cancels on SIGTERM/SIGINT, launches every component
/// concurrently, and cancels the shared token the moment any component
/// returns an error so the rest can wind down. It waits for every
/// component to return before yielding the first error observed, if any.
pub struct Lifecycle {
    config: Arc<LifecycleConfig>,
}

impl Lifecycle {
    /// Starts a new builder.
    pub fn builder() -> LifecycleConfigBuilder {
        LifecycleConfigBuilder::new()
    }

    /// Runs `components` to completion under a context derived from
    /// `parent`, returning the first error any component returned.
    pub async fn run(&self, parent: CancellationToken, components: Vec<Component>) -> Result<(), ComponentError> {
        let token = parent.child_token();

        let signal_token = token.clone();
        let config = Arc::clone(&self.config);
        let signal_task = tokio::spawn(async move {
            tokio::select! {
                _ = termination_signal() => {
                    config.event_listeners.emit(&LifecycleEvent::SignalReceived {
                        timestamp: Instant::now(),
                        signal: "SIGTERM/SIGINT",
                    });
                    #[cfg(feature = "metrics")]
                    counter!("lifecycle_signals_total").increment(1);
                    signal_token.cancel();
                }
                _ = signal_token.cancelled() => {}
            }
        });

        let mut set = JoinSet::new();
        for component in components {
            let component_token = token.clone();
            set.spawn(async move {
                let name = component.name.clone();
                let result = (component.run)(component_token).await;
                (name, result)
            });
        }

        let mut first_error = None;

        while let Some(joined) = set.join_next().await {
            let (name, result) = joined.expect("lifecycle component panicked");
            let failed = result.is_err();

            self.config.event_listeners.emit(&LifecycleEvent::ComponentExited {
                timestamp: Instant::now(),
                name: name.clone(),
                failed,
            });
            #[cfg(feature = "metrics")]
            counter!("lifecycle_components_exited_total", "failed" => failed.to_string()).increment(1);

            if let Err(source) = result {
                if first_error.is_none() {
                    first_error = Some(ComponentError::new(name, source));
                    token.cancel();
                }
            }
        }

        token.cancel();
        signal_task.abort();

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
