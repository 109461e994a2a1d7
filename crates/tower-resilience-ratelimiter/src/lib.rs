//! Per-key, LRU-bounded token-bucket rate limiting for inbound requests.
//!
//! Unlike a global permit bucket, every distinct key (by default, the
//! caller's IP) gets its own bucket, so one noisy client can't starve
//! another. Memory is bounded by evicting the least-recently-used key once
//! `max_keys` distinct keys are being tracked concurrently (§3, §4.5).
//!
//! # Example
//!
//! ```
//! use tower_resilience_ratelimiter::{RateLimiterConfig, RateLimiterLayer};
//! use tower_resilience_ratelimiter::key::RemoteAddrKey;
//! use axum::body::Body;
//! use std::time::Duration;
//!
//! # fn example() {
//! let config = RateLimiterConfig::<Body>::builder()
//!     .rate(100.0)
//!     .window(Duration::from_secs(1))
//!     .max_keys(50_000)
//!     .key_extractor(RemoteAddrKey)
//!     .build()
//!     .expect("valid configuration");
//!
//! let layer = RateLimiterLayer::new(config);
//! # let _ = layer;
//! # }
//! ```

pub mod bucket;
pub mod config;
pub mod error;
pub mod events;
pub mod key;
mod layer;

pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use error::{ConfigError, RateLimitExceeded};
pub use events::RateLimiterEvent;
pub use key::{HeaderKey, KeyExtractor, RemoteAddrKey, XForwardedForKey};
pub use layer::RateLimiterLayer;

use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use futures::future::BoxFuture;
use tower::Service;
use tower_resilience_core::ServiceError;

use crate::bucket::LruBuckets;

#[cfg(feature = "metrics")]
use metrics::counter;

/// A Tower service that rejects requests exceeding their key's token-bucket
/// rate before they ever reach `inner`.
#[derive(Clone)]
pub struct RateLimiter<S, B> {
    inner: S,
    config: Arc<RateLimiterConfig<B>>,
    buckets: Arc<Mutex<LruBuckets>>,
}

impl<S, B> RateLimiter<S, B> {
    pub(crate) fn new(inner: S, config: Arc<RateLimiterConfig<B>>, buckets: Arc<Mutex<LruBuckets>>) -> Self {
        Self { inner, config, buckets }
    }
}

fn problem_response(err: &ServiceError) -> Response<Body> {
    let (status, json) = tower_resilience_core::error::render_problem(err, "", "");
    let body = serde_json::to_vec(&json).unwrap_or_default();
    Response::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::TOO_MANY_REQUESTS))
        .header("content-type", "application/problem+json")
        .header("retry-after", "1")
        .body(Body::from(body))
        .expect("problem response is well-formed")
}

impl<S, B> Service<Request<B>> for RateLimiter<S, B>
where
    S: Service<Request<B>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    B: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let key = self.config.key_extractor.extract(&req);

        let admission = {
            let mut buckets = self.buckets.lock().expect("rate limiter lock poisoned");
            buckets.admit(&key)
        };

        if let Some(evicted) = &admission.evicted {
            #[cfg(feature = "metrics")]
            counter!("rate_limiter_keys_evicted_total", "limiter" => self.config.name.clone()).increment(1);
            self.config.event_listeners.emit(&RateLimiterEvent::KeyEvicted {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                key: evicted.clone(),
            });
        }

        if admission.allowed {
            #[cfg(feature = "metrics")]
            counter!("rate_limiter_admitted_total", "limiter" => self.config.name.clone()).increment(1);
            self.config.event_listeners.emit(&RateLimiterEvent::Admitted {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                key,
                tokens_remaining: admission.tokens_remaining,
            });

            let mut inner = self.inner.clone();
            Box::pin(async move { inner.call(req).await })
        } else {
            #[cfg(feature = "metrics")]
            counter!("rate_limiter_rejected_total", "limiter" => self.config.name.clone()).increment(1);
            self.config.event_listeners.emit(&RateLimiterEvent::Rejected {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                key,
            });

            #[cfg(feature = "tracing")]
            tracing::warn!(limiter = %self.config.name, "rate limit exceeded");

            let response = problem_response(&ServiceError::from(RateLimitExceeded));
            Box::pin(async move { Ok(response) })
        }
    }
}
