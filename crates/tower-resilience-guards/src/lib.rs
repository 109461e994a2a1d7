//! Inbound request-policing guards: each is a `Handler -> Handler`
//! transformer that can be composed in any order (§2, §4.7, §4.11).
//!
//! This crate ships the guards that aren't specializations of a bigger
//! pattern crate: [`cors`], [`ip_filter`], [`max_body`], [`security_headers`],
//! [`request_id`], and [`recovery`]. Rate limiting lives in
//! `tower-resilience-ratelimiter` and the timeout guard lives in
//! `tower-resilience-timelimiter`, since both reuse machinery (token
//! buckets, buffered responses) that belongs with those patterns.
//!
//! # Example
//!
//! ```
//! use tower::ServiceBuilder;
//! use tower_resilience_guards::cors::CorsConfig;
//! use tower_resilience_guards::{CorsLayer, RequestIdLayer, SecurityHeadersLayer};
//! use tower_resilience_guards::security_headers::SecurityHeadersConfig;
//!
//! # fn build<S>(inner: S) {
//! let cors = CorsLayer::new(CorsConfig::builder().allow_any_origin().build().unwrap());
//! let _service = ServiceBuilder::new()
//!     .layer(SecurityHeadersLayer::new(SecurityHeadersConfig::recommended()))
//!     .layer(cors)
//!     .layer(RequestIdLayer)
//!     .service(inner);
//! # }
//! ```

pub mod cors;
pub mod error;
pub mod events;
pub mod ip_filter;
pub mod max_body;
pub mod recovery;
pub mod request_id;
pub mod security_headers;

pub use cors::{CorsConfig, CorsLayer};
pub use error::ConfigError;
pub use events::GuardEvent;
pub use ip_filter::{IpFilterConfig, IpFilterLayer};
pub use max_body::MaxBodyLayer;
pub use recovery::RecoveryLayer;
pub use request_id::{RequestId, RequestIdLayer};
pub use security_headers::{SecurityHeadersConfig, SecurityHeadersLayer};
