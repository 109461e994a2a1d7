//! Core infrastructure for tower-resilience.
//!
//! This crate provides shared functionality used across all tower-resilience modules:
//! - The unified [`error::ServiceError`] model and RFC 9457 Problem Details
//! - Event system for observability
//! - Metrics infrastructure
//! - Common configuration patterns

pub mod error;
pub mod events;

pub use error::{ErrorKind, ProblemDetail, RpcStatus, ServiceError};
pub use events::{EventListener, ResilienceEvent};
