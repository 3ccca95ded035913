//! In-memory [`Store`](crate::port::Store) implementation for tests.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rand::seq::SliceRandom;

use crate::domain::{BidPoint, ClientIdentity, Item, PricePoint, Search, SearchExecution};
use crate::error::{Error, Result};
use crate::port::{ExecutionStore, IdentityStore, ItemStore, SearchStore};

#[derive(Default)]
struct Tables {
    searches: Vec<Search>,
    items: Vec<Item>,
    prices: Vec<PricePoint>,
    bids: Vec<BidPoint>,
    links: Vec<(i64, i64)>,
    identities: Vec<ClientIdentity>,
    executions: Vec<SearchExecution>,
    next_id: i64,
}

/// An in-memory store with assertion accessors for every table.
///
/// Ids are assigned from a shared counter so search and item ids never
/// collide inside one test.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_items: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a search, returning it with its assigned id.
    pub fn add_search(&self, mut search: Search) -> Search {
        let mut tables = self.tables.lock();
        tables.next_id += 1;
        search.id = tables.next_id;
        tables.searches.push(search.clone());
        search
    }

    /// Seed an identity row.
    pub fn add_identity(&self, identity: ClientIdentity) {
        self.tables.lock().identities.push(identity);
    }

    /// Make every item operation fail with a database error.
    pub fn fail_item_ops(&self, fail: bool) {
        *self.fail_items.lock() = fail;
    }

    pub fn item_count(&self) -> usize {
        self.tables.lock().items.len()
    }

    pub fn items(&self) -> Vec<Item> {
        self.tables.lock().items.clone()
    }

    pub fn price_rows_for(&self, item_id: i64) -> Vec<PricePoint> {
        self.tables
            .lock()
            .prices
            .iter()
            .filter(|p| p.item_id == item_id)
            .cloned()
            .collect()
    }

    pub fn bid_rows_for(&self, item_id: i64) -> Vec<BidPoint> {
        self.tables
            .lock()
            .bids
            .iter()
            .filter(|b| b.item_id == item_id)
            .cloned()
            .collect()
    }

    pub fn links(&self) -> Vec<(i64, i64)> {
        self.tables.lock().links.clone()
    }

    pub fn executions(&self) -> Vec<SearchExecution> {
        self.tables.lock().executions.clone()
    }

    fn check_item_ops(&self) -> Result<()> {
        if *self.fail_items.lock() {
            return Err(Error::Database("item table unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchStore for MemoryStore {
    async fn list_enabled_searches(&self) -> Result<Vec<Search>> {
        Ok(self
            .tables
            .lock()
            .searches
            .iter()
            .filter(|s| s.enabled)
            .cloned()
            .collect())
    }

    async fn get_search(&self, id: i64) -> Result<Search> {
        self.tables
            .lock()
            .searches
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(Error::NotFound {
                entity: "search",
                id: id.to_string(),
            })
    }

    async fn insert_search(&self, search: &Search) -> Result<i64> {
        Ok(self.add_search(search.clone()).id)
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn get_item_by_external_id(&self, external_id: &str) -> Result<Option<Item>> {
        self.check_item_ops()?;
        Ok(self
            .tables
            .lock()
            .items
            .iter()
            .find(|i| i.external_id == external_id)
            .cloned())
    }

    async fn insert_item(&self, item: &Item) -> Result<i64> {
        self.check_item_ops()?;
        let mut tables = self.tables.lock();
        tables.next_id += 1;
        let id = tables.next_id;
        let mut item = item.clone();
        item.id = id;
        tables.items.push(item);
        Ok(id)
    }

    async fn update_item(&self, item: &Item) -> Result<()> {
        self.check_item_ops()?;
        let mut tables = self.tables.lock();
        let stored = tables
            .items
            .iter_mut()
            .find(|i| i.id == item.id)
            .ok_or(Error::NotFound {
                entity: "item",
                id: item.id.to_string(),
            })?;
        *stored = item.clone();
        Ok(())
    }

    async fn recent_items(&self, max_age: Duration, limit: i64) -> Result<Vec<Item>> {
        self.check_item_ops()?;
        let cutoff = Utc::now()
            - chrono::Duration::from_std(max_age).map_err(|e| Error::Parse(e.to_string()))?;
        let mut items: Vec<Item> = self
            .tables
            .lock()
            .items
            .iter()
            .filter(|i| i.last_seen > cutoff)
            .cloned()
            .collect();
        items.sort_by_key(|i| std::cmp::Reverse(i.last_seen));
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn append_price(&self, point: &PricePoint) -> Result<()> {
        self.check_item_ops()?;
        self.tables.lock().prices.push(point.clone());
        Ok(())
    }

    async fn append_bid(&self, point: &BidPoint) -> Result<()> {
        self.check_item_ops()?;
        self.tables.lock().bids.push(point.clone());
        Ok(())
    }

    async fn link_search_item(&self, search_id: i64, item_id: i64) -> Result<()> {
        self.check_item_ops()?;
        let mut tables = self.tables.lock();
        if !tables.links.contains(&(search_id, item_id)) {
            tables.links.push((search_id, item_id));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn active_identities(&self) -> Result<Vec<ClientIdentity>> {
        Ok(self
            .tables
            .lock()
            .identities
            .iter()
            .filter(|i| i.active)
            .cloned()
            .collect())
    }

    async fn random_identity(&self) -> Result<ClientIdentity> {
        self.active_identities()
            .await?
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(Error::NotFound {
                entity: "client_identity",
                id: "any".to_string(),
            })
    }

    async fn bump_identity_usage(&self, id: i64) -> Result<()> {
        let mut tables = self.tables.lock();
        if let Some(identity) = tables.identities.iter_mut().find(|i| i.id == id) {
            identity.usage_count += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn record_execution(&self, execution: &SearchExecution) -> Result<()> {
        let mut tables = self.tables.lock();
        if let Some(stored) = tables.executions.iter_mut().find(|e| e.id == execution.id) {
            *stored = execution.clone();
        } else {
            tables.executions.push(execution.clone());
        }
        Ok(())
    }
}
