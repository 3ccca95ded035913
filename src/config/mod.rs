//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all application
//! settings. Configuration is loaded from a TOML file; every section has
//! working defaults so a minimal file (or none at all) still boots.

pub mod dedup;
pub mod logging;
pub mod resilience;
pub mod scheduler;

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{ConfigError, Result};
pub use dedup::{DedupConfig, FieldWeights};
pub use logging::LoggingConfig;
pub use resilience::{
    CircuitBreakerConfig, IdentityConfig, RateLimitConfig, RetryConfig, TimingConfig,
};
pub use scheduler::SchedulerConfig;

/// Marketplace endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// Base URL of the marketplace API.
    pub base_url: String,
    /// Path of the search endpoint, relative to `base_url`.
    pub search_path: String,
    /// Optional path of the authentication endpoint.
    #[serde(default)]
    pub auth_path: Option<String>,
    /// Per-request HTTP timeout, in seconds.
    pub timeout_secs: u64,
    /// Results requested per search page.
    pub page_size: u32,
}

impl MarketplaceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "marketplace.base_url",
            }
            .into());
        }
        // Malformed URLs must fail at construction, never at request time.
        Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidValue {
            field: "marketplace.base_url",
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://marketplace.example.com".into(),
            search_path: "/api/search".into(),
            auth_path: None,
            timeout_secs: 30,
            page_size: 50,
        }
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database path, or `:memory:` for an in-memory database.
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "bidwatch.db".into(),
        }
    }
}

/// Main application configuration.
///
/// Aggregates all configuration settings. Load from a TOML file using
/// [`Config::load`] or parse directly with [`Config::parse_toml`].
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub marketplace: MarketplaceConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub dedup: DedupConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string and validate it.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints, failing fast on bad values.
    pub fn validate(&self) -> Result<()> {
        self.marketplace.validate()?;
        self.identity.validate()?;
        self.scheduler.validate()?;
        self.dedup.validate()?;
        Ok(())
    }

    /// Initialize the tracing subscriber from the logging section.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
