use std::time::Duration;

use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Errors produced by the resilience layer (rate limiting, circuit breaking,
/// retries, identity rotation).
#[derive(Error, Debug)]
pub enum ResilienceError {
    #[error("circuit breaker open, refusing request")]
    CircuitOpen,

    #[error("circuit breaker half-open probe already in flight")]
    ProbeInFlight,

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    #[error("operation cancelled by shutdown")]
    Cancelled,

    #[error("soft block detected (status {status})")]
    SoftBlock { status: u16 },

    #[error("guarded call faulted: {0}")]
    Fault(String),
}

/// Errors produced by the scheduling engine.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("search {id} not found")]
    SearchNotFound { id: i64 },

    #[error("search {id} is disabled")]
    SearchDisabled { id: i64 },

    #[error("search {id} is already active")]
    SearchAlreadyActive { id: i64 },

    #[error("execution queue is full")]
    QueueFull,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resilience(#[from] ResilienceError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("marketplace returned status {status}")]
    Status { status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True when the error is the circuit breaker refusing to attempt a call.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Error::Resilience(ResilienceError::CircuitOpen))
    }

    /// True when the error was caused by shutdown cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Resilience(ResilienceError::Cancelled))
    }
}
