//! Parallel named health checks with joined errors (§4.10).
//!
//! [`HealthAggregator`] runs every registered check concurrently via
//! [`tower_resilience_concurrency::map`]: a slow or failing check never
//! blocks or masks its peers, and the resulting [`HealthReport`] names every
//! check's outcome individually. The `http` feature adds an axum handler
//! rendering the report as 200/503; [`grpc::ServingStatus`] adapts the same
//! report to a gRPC health responder's two states.
//!
//! # Example
//!
//! ```
//! use tower_resilience_healthcheck::HealthAggregator;
//!
//! # async fn example() {
//! let aggregator = HealthAggregator::builder()
//!     .check("database", || async { Ok(()) })
//!     .check("downstream_api", || async { Err("timed out".into()) })
//!     .build();
//!
//! let report = aggregator.run().await;
//! assert!(!report.healthy());
//! # }
//! ```

mod aggregator;
pub mod grpc;
#[cfg(feature = "http")]
mod http;

pub use aggregator::{CheckResult, HealthAggregator, HealthAggregatorBuilder, HealthReport};
#[cfg(feature = "http")]
pub use http::health_handler;
