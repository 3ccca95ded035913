//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`client`] — Mock [`MarketplaceClient`](crate::port::MarketplaceClient)
//!   implementations: `ScriptedClient`, `HangingClient`.
//! - [`store`] — In-memory [`Store`](crate::port::Store) with assertion
//!   accessors for every table.
//! - [`domain`] — Builders for domain primitives: searches, listings, items.

pub mod client;
pub mod domain;
pub mod store;

pub use client::{HangingClient, ScriptedClient};
pub use domain::{item, listing, search};
pub use store::MemoryStore;
