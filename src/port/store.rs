//! Persistence ports for searches, items, identities, and execution audits.
//!
//! All methods return [`Error::NotFound`](crate::error::Error::NotFound) as a
//! typed miss, distinct from lower-level `Database`/`Connection` faults.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{BidPoint, ClientIdentity, Item, PricePoint, Search, SearchExecution};
use crate::error::Result;

/// Storage operations for saved searches.
#[async_trait]
pub trait SearchStore: Send + Sync {
    /// List all searches with the enabled flag set.
    async fn list_enabled_searches(&self) -> Result<Vec<Search>>;

    /// Get a search by id, failing with `NotFound` if missing.
    async fn get_search(&self, id: i64) -> Result<Search>;

    /// Insert a search, returning the assigned id.
    async fn insert_search(&self, search: &Search) -> Result<i64>;
}

/// Storage operations for items and their history.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Look up an item by its marketplace id.
    async fn get_item_by_external_id(&self, external_id: &str) -> Result<Option<Item>>;

    /// Insert an item, returning the assigned id.
    async fn insert_item(&self, item: &Item) -> Result<i64>;

    /// Rewrite a stored item's fields in place.
    async fn update_item(&self, item: &Item) -> Result<()>;

    /// Items seen within `max_age`, newest first, capped at `limit`.
    ///
    /// Bounds the deduplication engine's comparison set.
    async fn recent_items(&self, max_age: Duration, limit: i64) -> Result<Vec<Item>>;

    /// Append a price history row.
    async fn append_price(&self, point: &PricePoint) -> Result<()>;

    /// Append a bid history row.
    async fn append_bid(&self, point: &BidPoint) -> Result<()>;

    /// Associate an item with the search that discovered it.
    async fn link_search_item(&self, search_id: i64, item_id: i64) -> Result<()>;
}

/// Storage operations for client identities.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// All identities with the active flag set.
    async fn active_identities(&self) -> Result<Vec<ClientIdentity>>;

    /// A uniformly random active identity.
    async fn random_identity(&self) -> Result<ClientIdentity>;

    /// Increment an identity's usage counter.
    async fn bump_identity_usage(&self, id: i64) -> Result<()>;
}

/// Storage operations for the execution audit trail.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Insert or update an execution row keyed by its uuid.
    async fn record_execution(&self, execution: &SearchExecution) -> Result<()>;
}

/// Full repository contract consumed by the scheduler.
pub trait Store: SearchStore + ItemStore + IdentityStore + ExecutionStore {}

impl<T: SearchStore + ItemStore + IdentityStore + ExecutionStore> Store for T {}
