//! Configuration for the resilience and anti-detection layer.
//!
//! Covers the token bucket, circuit breaker, retry backoff, human-like
//! timing, and client identity rotation.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Token bucket rate limiting settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sustained request budget in requests per minute.
    pub requests_per_minute: u32,
    /// Maximum burst size; the bucket never holds more than this many tokens.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 30,
            burst: 5,
        }
    }
}

/// Circuit breaker thresholds and timeouts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the breaker from Closed to Open.
    pub failure_threshold: u32,
    /// Consecutive half-open successes required to close the breaker again.
    pub success_threshold: u32,
    /// How long the breaker stays Open before allowing a half-open probe,
    /// in milliseconds.
    pub reset_timeout_ms: u64,
    /// Wall-clock bound on a single half-open probe call, in milliseconds.
    pub probe_timeout_ms: u64,
}

impl CircuitBreakerConfig {
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout_ms: 60_000,
            probe_timeout_ms: 30_000,
        }
    }
}

/// Exponential backoff retry settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the initial attempt; 3 means up to 4 calls total.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound on any single retry delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

/// Human-like request cadence settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Base think-time between requests, in milliseconds.
    pub base_interval_ms: u64,
    /// Lower jitter bound applied to the base interval, in milliseconds.
    pub min_jitter_ms: u64,
    /// Upper jitter bound applied to the base interval, in milliseconds.
    pub max_jitter_ms: u64,
    /// Whether to add an extra randomized human-like jitter per request.
    pub human_variation: bool,
}

impl TimingConfig {
    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms)
    }

    pub fn min_jitter(&self) -> Duration {
        Duration::from_millis(self.min_jitter_ms)
    }

    pub fn max_jitter(&self) -> Duration {
        Duration::from_millis(self.max_jitter_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: 2_000,
            min_jitter_ms: 500,
            max_jitter_ms: 2_000,
            human_variation: true,
        }
    }
}

/// Client identity rotation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// How often the identity cache is refreshed from the store, in seconds.
    pub rotation_interval_secs: u64,
    /// Minimum tracked success rate for an identity to be preferred.
    pub min_success_rate: f64,
}

impl IdentityConfig {
    pub fn rotation_interval(&self) -> Duration {
        Duration::from_secs(self.rotation_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_success_rate) {
            return Err(ConfigError::InvalidValue {
                field: "identity.min_success_rate",
                reason: format!("{} is outside [0, 1]", self.min_success_rate),
            });
        }
        Ok(())
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            rotation_interval_secs: 300,
            min_success_rate: 0.7,
        }
    }
}
