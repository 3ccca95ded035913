//! Outbound ports: persistence and marketplace client contracts.

pub mod client;
pub mod store;

pub use client::{MarketplaceClient, SearchPage, SearchQuery};
pub use store::{ExecutionStore, IdentityStore, ItemStore, SearchStore, Store};
