//! Errors produced by the rate limiter.

use std::fmt;

use tower_resilience_core::ServiceError;

/// A configuration value rejected at construction time.
///
/// Per §4.5, `rate`, `window`, and `max_keys` are validated when the
/// limiter is built, not on first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub(crate) String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid rate limiter configuration: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// The caller's key exceeded its token bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitExceeded;

impl fmt::Display for RateLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rate limit exceeded")
    }
}

impl std::error::Error for RateLimitExceeded {}

impl From<RateLimitExceeded> for ServiceError {
    fn from(_: RateLimitExceeded) -> Self {
        ServiceError::rate_limit("rate limit exceeded").with_detail("retry_after_seconds", 1)
    }
}
