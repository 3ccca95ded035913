//! Token bucket rate limiter.
//!
//! Non-blocking: callers poll [`RateLimiter::allow_request`] and back off
//! externally when denied. Refill is lazy and happens under the same lock as
//! the decrement, so admission is a single atomic step.

use std::time::Instant;

use parking_lot::Mutex;

use crate::config::RateLimitConfig;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket admitting at most `burst` requests ahead of the sustained
/// per-minute rate.
pub struct RateLimiter {
    state: Mutex<BucketState>,
    rate_per_sec: f64,
    burst: f64,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let burst = f64::from(config.burst);
        Self {
            state: Mutex::new(BucketState {
                tokens: burst,
                last_refill: Instant::now(),
            }),
            rate_per_sec: f64::from(config.requests_per_minute) / 60.0,
            burst,
        }
    }

    /// Admit one request if a whole token is available.
    pub fn allow_request(&self) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently available, after a refill. Observability only.
    pub fn available_tokens(&self) -> f64 {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate_per_sec).min(self.burst);
        state.last_refill = now;
    }
}
