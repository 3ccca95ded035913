//! Outbound HTTP adapter for the marketplace API.

pub mod client;

pub use client::HttpMarketplaceClient;
