use std::time::Duration;

use crate::circuit::CircuitBreakerRegistry;
use crate::layer::CircuitBreakerLayer;

/// Builder for a named circuit breaker.
///
/// Breakers are process-wide singletons keyed by name (see
/// [`CircuitBreakerRegistry`]): building two layers with the same `name`
/// yields two `Layer`s wrapping the very same underlying breaker state, and
/// the threshold/reset_timeout of whichever call registers the name first
/// wins.
pub struct CircuitBreakerConfigBuilder {
    name: Option<String>,
    threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreakerConfigBuilder {
    fn new() -> Self {
        Self {
            name: None,
            threshold: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }

    /// The breaker's registry name. Required.
    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Consecutive failures required to trip the breaker open.
    ///
    /// Default: 5. Clamped to at least 1.
    pub fn threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    /// How long the breaker stays open before admitting a half-open probe.
    ///
    /// Default: 30 seconds.
    pub fn reset_timeout(mut self, reset_timeout: Duration) -> Self {
        self.reset_timeout = reset_timeout;
        self
    }

    /// Builds the layer, registering (or reusing) the named breaker.
    ///
    /// # Panics
    ///
    /// Panics if [`Self::name`] was never called.
    pub fn build(self) -> CircuitBreakerLayer {
        let name = self
            .name
            .expect("CircuitBreakerConfigBuilder::name must be set before build()");
        let breaker = CircuitBreakerRegistry::get_or_init(&name, self.threshold, self.reset_timeout);
        CircuitBreakerLayer::from_breaker(breaker)
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
