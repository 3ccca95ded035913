//! Marketplace network client contract.
//!
//! The business payload shape is deliberately generic; adapters map their
//! wire formats onto [`Listing`]. The resilience layer wraps every call with
//! identity injection, circuit breaking, and retry.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{ClientIdentity, Listing, Search};
use crate::error::Result;

/// Parameters for one marketplace search call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    pub category: Option<String>,
    pub max_price: Option<Decimal>,
    pub page: u32,
    pub page_size: u32,
}

impl SearchQuery {
    /// Build the first-page query for a saved search.
    pub fn for_search(search: &Search, page_size: u32) -> Self {
        Self {
            query: search.query.clone(),
            category: search.category.clone(),
            max_price: search.max_price,
            page: 1,
            page_size,
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub listings: Vec<Listing>,
    pub total: u64,
}

/// Outbound marketplace client.
#[async_trait]
pub trait MarketplaceClient: Send + Sync {
    /// Establish or refresh a session with the marketplace.
    async fn authenticate(&self) -> Result<()>;

    /// Run a search under the given client identity.
    async fn search(&self, query: &SearchQuery, identity: &ClientIdentity) -> Result<SearchPage>;
}
