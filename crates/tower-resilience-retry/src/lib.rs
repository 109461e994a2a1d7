//! Context-aware retry for a single outbound HTTP call.
//!
//! [`Retrier`] drives the resilient client's retry rule set: network-level
//! errors and 5xx responses are retried with exponential backoff and
//! jitter, 4xx responses are returned immediately, and a cancelled
//! [`tokio_util::sync::CancellationToken`] aborts both an in-flight attempt
//! and any pending backoff sleep.
//!
//! # Example
//!
//! ```
//! use tower_resilience_retry::{Attempt, Retrier, RetrierConfig};
//! use tokio_util::sync::CancellationToken;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let retrier = Retrier::new(RetrierConfig::new(3, Duration::from_millis(100)).name("payments-api"));
//!
//! let (response, error) = retrier
//!     .execute::<&str, &str, _, _, _, _>(
//!         &CancellationToken::new(),
//!         |_attempt| async { Attempt::Responded { response: "ok", status: 200 } },
//!         |_dropped_response| async {},
//!     )
//!     .await;
//! # let _ = (response, error);
//! # }
//! ```

mod events;
mod retrier;

pub use events::RetryEvent;
pub use retrier::{Attempt, Retrier, RetrierConfig};
