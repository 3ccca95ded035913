//! Bidwatch - resilient marketplace auction watching.
//!
//! Periodically runs saved marketplace searches, stores the items they find,
//! and keeps the result set clean under hostile network conditions:
//!
//! - **`resilience`** - the outbound gate every marketplace call passes
//!   through: token-bucket rate limiting, a three-state circuit breaker,
//!   retry with jittered exponential backoff, human-like request cadence,
//!   and rotating client identities with per-identity success tracking.
//! - **`scheduler`** - the periodic engine: jittered one-shot timers feeding
//!   a bounded queue drained by a fixed worker pool, with per-search
//!   serialization and out-of-cycle retry re-enqueues.
//! - **`dedup`** - fingerprint-based duplicate detection and merging of
//!   relisted items into a canonical row.
//!
//! # Modules
//!
//! - [`config`] - TOML configuration with working defaults for every section
//! - [`domain`] - searches, items, history points, identities
//! - [`port`] - store and marketplace-client traits at the adapter seams
//! - [`adapter`] - SQLite persistence (Diesel) and the reqwest HTTP client
//! - [`app`] - wiring and the run-until-ctrl-c loop
//! - [`error`] - error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use bidwatch::app::App;
//! use bidwatch::config::Config;
//!
//! # async fn run() -> bidwatch::error::Result<()> {
//! let config = Config::load("config.toml")?;
//! config.init_logging();
//! App::run(config).await
//! # }
//! ```

pub mod adapter;
pub mod app;
pub mod config;
pub mod dedup;
pub mod domain;
pub mod error;
pub mod port;
pub mod resilience;
pub mod scheduler;
pub mod shutdown;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
