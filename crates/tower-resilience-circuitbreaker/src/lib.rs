//! Circuit breaker middleware for Tower services.
//!
//! A circuit breaker protects a downstream dependency from being hammered
//! while it is failing. This implementation counts *consecutive* failures
//! rather than a failure rate over a sliding window:
//!
//! - **Closed**: calls pass through; `threshold` consecutive failures trips
//!   the breaker to `Open`.
//! - **Open**: calls are rejected immediately with [`CircuitOpenError`]. The
//!   first call observed after `reset_timeout` has elapsed moves the breaker
//!   to `HalfOpen` and is let through.
//! - **HalfOpen**: the next success closes the breaker; the next failure
//!   reopens it.
//!
//! Breakers are process-wide singletons keyed by name, so that multiple
//! layers built with the same name share state:
//!
//! ```rust
//! use tower::{service_fn, ServiceBuilder};
//! use tower_resilience_circuitbreaker::CircuitBreakerLayer;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let layer = CircuitBreakerLayer::builder()
//!     .name("payments-api")
//!     .threshold(5)
//!     .reset_timeout(Duration::from_secs(30))
//!     .build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(layer)
//!     .service(service_fn(|req: String| async move { Ok::<_, std::io::Error>(req) }));
//! # }
//! ```
//!
//! ## Feature flags
//! - `metrics`: emits counters via the `metrics` crate
//! - `tracing`: emits state-transition events via the `tracing` crate
//! - `serde`: derives `Serialize`/`Deserialize` for [`CircuitState`]

mod circuit;
mod config;
mod error;
mod events;
mod layer;

pub use circuit::{CircuitBreaker, CircuitBreakerRegistry, CircuitState};
pub use config::CircuitBreakerConfigBuilder;
pub use error::{CircuitBreakerError, CircuitOpenError};
pub use events::CircuitBreakerEvent;
pub use layer::{CircuitBreakerLayer, CircuitBreakerService};
