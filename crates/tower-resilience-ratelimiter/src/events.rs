//! Observability events emitted by the rate limiter.

use std::time::Instant;

use tower_resilience_core::events::ResilienceEvent;

/// Events emitted by a [`crate::RateLimiter`] as it admits, evicts, and
/// rejects keys.
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// A request for `key` was allowed; `tokens_remaining` is the bucket's
    /// token count immediately after the decrement.
    Admitted {
        /// The limiter instance's name.
        pattern_name: String,
        /// When the decision was made.
        timestamp: Instant,
        /// The key that was admitted.
        key: String,
        /// Tokens left in the bucket after this request.
        tokens_remaining: f64,
    },
    /// A request for `key` was rejected because its bucket had fewer than
    /// one token available.
    Rejected {
        /// The limiter instance's name.
        pattern_name: String,
        /// When the decision was made.
        timestamp: Instant,
        /// The key that was rejected.
        key: String,
    },
    /// The least-recently-used key was evicted from the bounded LRU to make
    /// room for a new key.
    KeyEvicted {
        /// The limiter instance's name.
        pattern_name: String,
        /// When the eviction happened.
        timestamp: Instant,
        /// The key that was evicted.
        key: String,
    },
}

impl ResilienceEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::Admitted { .. } => "admitted",
            RateLimiterEvent::Rejected { .. } => "rejected",
            RateLimiterEvent::KeyEvicted { .. } => "key_evicted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::Admitted { timestamp, .. } => *timestamp,
            RateLimiterEvent::Rejected { timestamp, .. } => *timestamp,
            RateLimiterEvent::KeyEvicted { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RateLimiterEvent::Admitted { pattern_name, .. } => pattern_name,
            RateLimiterEvent::Rejected { pattern_name, .. } => pattern_name,
            RateLimiterEvent::KeyEvicted { pattern_name, .. } => pattern_name,
        }
    }
}
