//! Resilience and anti-detection layer.
//!
//! Leaf primitives ([`RateLimiter`], [`CircuitBreaker`], [`RetryManager`],
//! [`TimingManager`], [`SuccessTracker`]) composed by [`AntiBotSystem`] and
//! [`ResilientClient`] into the gate that every outbound marketplace call
//! passes through.

pub mod antibot;
pub mod circuit_breaker;
pub mod client;
pub mod rate_limiter;
pub mod retry;
pub mod success;
pub mod timing;

pub use antibot::{is_blocking_response, AntiBotSystem};
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use client::ResilientClient;
pub use rate_limiter::RateLimiter;
pub use retry::RetryManager;
pub use success::SuccessTracker;
pub use timing::TimingManager;
