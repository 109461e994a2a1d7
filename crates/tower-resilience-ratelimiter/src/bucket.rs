//! The per-key token bucket and its bounded LRU container.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// A single key's token bucket: fractional tokens plus the instant they
/// were last topped up.
#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_fill: Instant,
}

impl Bucket {
    fn full(rate: f64) -> Self {
        Self {
            tokens: rate,
            last_fill: Instant::now(),
        }
    }

    /// Refills proportionally to elapsed time, capped at `rate`, then tries
    /// to take one token. Returns `true` if a token was available.
    fn try_take(&mut self, rate: f64, window: Duration) -> bool {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_fill).as_secs_f64();
        let refill = elapsed / window.as_secs_f64() * rate;
        self.tokens = (self.tokens + refill).min(rate);
        self.last_fill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Outcome of admitting a key through the bucket store.
pub struct Admission {
    /// Whether the request is allowed to proceed.
    pub allowed: bool,
    /// Tokens remaining in the bucket right after this decision.
    pub tokens_remaining: f64,
    /// Set when admitting this key evicted another key to stay within
    /// `max_keys`.
    pub evicted: Option<String>,
}

/// A token-bucket rate limiter keyed by string, bounded to `max_keys`
/// entries via strict LRU eviction.
///
/// Every access — hit or miss — moves the key to most-recently-used. When a
/// *new* key arrives and the store is already at capacity, the
/// least-recently-used key is evicted before the new bucket is inserted,
/// per §3/§4.5.
pub struct LruBuckets {
    rate: f64,
    window: Duration,
    max_keys: usize,
    entries: HashMap<String, Bucket>,
    /// Front = least-recently-used, back = most-recently-used.
    order: VecDeque<String>,
}

impl LruBuckets {
    /// Creates an empty store. Callers are expected to have already
    /// validated `rate > 0`, `window > 0`, and `max_keys > 0` (see
    /// [`crate::config::RateLimiterConfig`]).
    pub fn new(rate: f64, window: Duration, max_keys: usize) -> Self {
        Self {
            rate,
            window,
            max_keys,
            entries: HashMap::with_capacity(max_keys.min(1024)),
            order: VecDeque::with_capacity(max_keys.min(1024)),
        }
    }

    /// The number of keys currently tracked. Never exceeds `max_keys`.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let k = self.order.remove(pos).expect("position just found");
            self.order.push_back(k);
        }
    }

    /// Admits (or rejects) a request for `key`, creating a fresh bucket on
    /// first sight and evicting the LRU entry first if the store is full.
    pub fn admit(&mut self, key: &str) -> Admission {
        let mut evicted = None;

        if self.entries.contains_key(key) {
            self.touch(key);
        } else {
            while self.entries.len() >= self.max_keys {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                    evicted = Some(oldest);
                } else {
                    break;
                }
            }
            self.entries.insert(key.to_string(), Bucket::full(self.rate));
            self.order.push_back(key.to_string());
        }

        let bucket = self.entries.get_mut(key).expect("just inserted or already present");
        let allowed = bucket.try_take(self.rate, self.window);
        Admission {
            allowed,
            tokens_remaining: bucket.tokens,
            evicted,
        }
    }
}
