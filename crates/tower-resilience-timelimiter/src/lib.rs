//! HTTP-shaped timeout guard for a buffered-response inbound service.
//!
//! [`guard::TimeoutGuard`] bounds how long an inner axum-shaped service may
//! take to produce a response before substituting a 504 Problem Detail
//! response of its own. It does not cancel the inner handler — there is no
//! general way to abort an arbitrary `Future` in flight — it only stops
//! waiting for it; a panicking handler is re-raised on the calling task so
//! an outer recovery layer can still observe it.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tower_resilience_timelimiter::guard::TimeoutGuardLayer;
//!
//! let layer = TimeoutGuardLayer::new(Duration::from_secs(5));
//! # let _ = layer;
//! ```

pub mod guard;
