//! Tower layer for the rate limiter guard.

use std::sync::{Arc, Mutex};

use tower::Layer;

use crate::bucket::LruBuckets;
use crate::config::RateLimiterConfig;
use crate::RateLimiter;

/// A Tower [`Layer`] that applies per-key, LRU-bounded token-bucket rate
/// limiting to inbound requests.
///
/// # Examples
///
/// ```
/// use tower_resilience_ratelimiter::{RateLimiterConfig, RateLimiterLayer};
/// use tower_resilience_ratelimiter::key::RemoteAddrKey;
/// use axum::body::Body;
/// use std::time::Duration;
///
/// let config = RateLimiterConfig::<Body>::builder()
///     .rate(100.0)
///     .window(Duration::from_secs(1))
///     .max_keys(10_000)
///     .key_extractor(RemoteAddrKey)
///     .build()
///     .expect("valid configuration");
///
/// let layer = RateLimiterLayer::new(config);
/// ```
#[derive(Clone)]
pub struct RateLimiterLayer<B> {
    config: Arc<RateLimiterConfig<B>>,
    buckets: Arc<Mutex<LruBuckets>>,
}

impl<B> RateLimiterLayer<B> {
    /// Builds a layer from a validated configuration.
    pub fn new(config: RateLimiterConfig<B>) -> Self {
        let buckets = LruBuckets::new(config.rate, config.window, config.max_keys);
        Self {
            config: Arc::new(config),
            buckets: Arc::new(Mutex::new(buckets)),
        }
    }
}

impl<S, B> Layer<S> for RateLimiterLayer<B> {
    type Service = RateLimiter<S, B>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimiter::new(service, Arc::clone(&self.config), Arc::clone(&self.buckets))
    }
}
