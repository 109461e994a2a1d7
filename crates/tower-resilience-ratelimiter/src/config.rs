//! Configuration for the per-key LRU rate limiter.

use std::sync::Arc;
use std::time::Duration;

use tower_resilience_core::events::{EventListeners, FnListener};

use crate::error::ConfigError;
use crate::events::RateLimiterEvent;
use crate::key::KeyExtractor;

/// Validated, immutable configuration for a [`crate::RateLimiterLayer`].
///
/// Built via [`RateLimiterConfig::builder`]; `build()` validates
/// `rate > 0`, `window > 0`, and `max_keys > 0` per §4.5 and returns a
/// [`ConfigError`] instead of panicking on an invalid combination.
pub struct RateLimiterConfig<B> {
    pub(crate) rate: f64,
    pub(crate) window: Duration,
    pub(crate) max_keys: usize,
    pub(crate) key_extractor: Arc<dyn KeyExtractor<B>>,
    pub(crate) event_listeners: EventListeners<RateLimiterEvent>,
    pub(crate) name: String,
}

/// Builder for [`RateLimiterConfig`].
pub struct RateLimiterConfigBuilder<B> {
    rate: f64,
    window: Duration,
    max_keys: usize,
    key_extractor: Option<Arc<dyn KeyExtractor<B>>>,
    event_listeners: EventListeners<RateLimiterEvent>,
    name: String,
}

impl<B> Default for RateLimiterConfigBuilder<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> RateLimiterConfigBuilder<B> {
    /// Creates a new builder.
    ///
    /// Defaults: `rate = 0` (must be set), `window = 1s`, `max_keys = 10_000`,
    /// no key extractor (must be set), name `"<unnamed>"`.
    pub fn new() -> Self {
        Self {
            rate: 0.0,
            window: Duration::from_secs(1),
            max_keys: 10_000,
            key_extractor: None,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the number of tokens a bucket refills to per `window`.
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Sets the refill window.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Sets the maximum number of distinct keys tracked at once. Beyond
    /// this, the least-recently-used key is evicted to admit a new one.
    pub fn max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = max_keys;
        self
    }

    /// Sets the strategy used to derive a bucketing key from each request.
    pub fn key_extractor<K>(mut self, key_extractor: K) -> Self
    where
        K: KeyExtractor<B> + 'static,
    {
        self.key_extractor = Some(Arc::new(key_extractor));
        self
    }

    /// Sets the name of this limiter instance, used in events.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback fired whenever a request is admitted.
    pub fn on_admitted<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, f64) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &RateLimiterEvent| {
            if let RateLimiterEvent::Admitted {
                key, tokens_remaining, ..
            } = event
            {
                f(key, *tokens_remaining);
            }
        }));
        self
    }

    /// Registers a callback fired whenever a request is rejected.
    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &RateLimiterEvent| {
            if let RateLimiterEvent::Rejected { key, .. } = event {
                f(key);
            }
        }));
        self
    }

    /// Validates and builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `rate <= 0`, `window` is zero,
    /// `max_keys == 0`, or no key extractor was configured.
    pub fn build(self) -> Result<RateLimiterConfig<B>, ConfigError>
    where
        B: 'static,
    {
        if self.rate <= 0.0 {
            return Err(ConfigError(format!("rate must be > 0, got {}", self.rate)));
        }
        if self.window.is_zero() {
            return Err(ConfigError("window must be > 0".to_string()));
        }
        if self.max_keys == 0 {
            return Err(ConfigError("max_keys must be > 0".to_string()));
        }
        let key_extractor = self
            .key_extractor
            .ok_or_else(|| ConfigError("a key_extractor is required".to_string()))?;

        Ok(RateLimiterConfig {
            rate: self.rate,
            window: self.window,
            max_keys: self.max_keys,
            key_extractor,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}

impl<B> RateLimiterConfig<B> {
    /// Starts a new builder.
    pub fn builder() -> RateLimiterConfigBuilder<B> {
        RateLimiterConfigBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::RemoteAddrKey;
    use axum::body::Body;

    #[test]
    fn rejects_non_positive_rate() {
        let err = RateLimiterConfig::<Body>::builder()
            .rate(0.0)
            .key_extractor(RemoteAddrKey)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("rate"));
    }

    #[test]
    fn rejects_zero_window() {
        let err = RateLimiterConfig::<Body>::builder()
            .rate(1.0)
            .window(Duration::ZERO)
            .key_extractor(RemoteAddrKey)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("window"));
    }

    #[test]
    fn rejects_zero_max_keys() {
        let err = RateLimiterConfig::<Body>::builder()
            .rate(1.0)
            .max_keys(0)
            .key_extractor(RemoteAddrKey)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max_keys"));
    }

    #[test]
    fn rejects_missing_key_extractor() {
        let err = RateLimiterConfig::<Body>::builder().rate(1.0).build().unwrap_err();
        assert!(err.to_string().contains("key_extractor"));
    }

    #[test]
    fn accepts_valid_configuration() {
        let config = RateLimiterConfig::<Body>::builder()
            .rate(10.0)
            .window(Duration::from_secs(1))
            .max_keys(1000)
            .key_extractor(RemoteAddrKey)
            .build()
            .unwrap();
        assert_eq!(config.rate, 10.0);
    }
}
