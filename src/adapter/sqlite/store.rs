//! SQLite-backed implementation of the persistence ports.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use rand::seq::SliceRandom;

use super::connection::DbPool;
use super::model::{
    ExecutionRow, IdentityRow, ItemRow, NewBidRow, NewItemRow, NewPriceRow, NewSearchRow,
    SearchRow,
};
use super::schema::{
    bid_history, client_identities, items, price_history, search_executions, search_items,
    searches,
};
use crate::domain::{BidPoint, ClientIdentity, Item, PricePoint, Search, SearchExecution};
use crate::error::{Error, Result};
use crate::port::{ExecutionStore, IdentityStore, ItemStore, SearchStore};

diesel::define_sql_function! {
    fn last_insert_rowid() -> BigInt;
}

/// SQLite-backed store implementing every persistence port.
pub struct SqliteStore {
    /// Database connection pool.
    pool: DbPool,
}

impl SqliteStore {
    /// Create a new store over the given connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>> {
        self.pool.get().map_err(|e| Error::Connection(e.to_string()))
    }
}

#[async_trait]
impl SearchStore for SqliteStore {
    async fn list_enabled_searches(&self) -> Result<Vec<Search>> {
        let mut conn = self.conn()?;
        let rows: Vec<SearchRow> = searches::table
            .filter(searches::enabled.eq(1))
            .order(searches::id.asc())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        rows.into_iter().map(SearchRow::into_domain).collect()
    }

    async fn get_search(&self, id: i64) -> Result<Search> {
        let mut conn = self.conn()?;
        let row: Option<SearchRow> = searches::table
            .find(id)
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        row.map(SearchRow::into_domain)
            .transpose()?
            .ok_or_else(|| Error::NotFound {
                entity: "search",
                id: id.to_string(),
            })
    }

    async fn insert_search(&self, search: &Search) -> Result<i64> {
        let mut conn = self.conn()?;
        diesel::insert_into(searches::table)
            .values(NewSearchRow::from_domain(search))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        diesel::select(last_insert_rowid())
            .get_result(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))
    }
}

#[async_trait]
impl ItemStore for SqliteStore {
    async fn get_item_by_external_id(&self, external_id: &str) -> Result<Option<Item>> {
        let mut conn = self.conn()?;
        let row: Option<ItemRow> = items::table
            .filter(items::external_id.eq(external_id))
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        row.map(ItemRow::into_domain).transpose()
    }

    async fn insert_item(&self, item: &Item) -> Result<i64> {
        let mut conn = self.conn()?;
        diesel::insert_into(items::table)
            .values(NewItemRow::from_domain(item))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        diesel::select(last_insert_rowid())
            .get_result(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn update_item(&self, item: &Item) -> Result<()> {
        let mut conn = self.conn()?;
        let updated = diesel::update(items::table.find(item.id))
            .set(ItemRow::from_domain(item))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        if updated == 0 {
            return Err(Error::NotFound {
                entity: "item",
                id: item.id.to_string(),
            });
        }
        Ok(())
    }

    async fn recent_items(&self, max_age: Duration, limit: i64) -> Result<Vec<Item>> {
        let mut conn = self.conn()?;
        let cutoff = (Utc::now()
            - chrono::Duration::from_std(max_age)
                .map_err(|e| Error::Parse(e.to_string()))?)
        .to_rfc3339();
        let rows: Vec<ItemRow> = items::table
            .filter(items::last_seen.gt(&cutoff))
            .order(items::last_seen.desc())
            .limit(limit)
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        rows.into_iter().map(ItemRow::into_domain).collect()
    }

    async fn append_price(&self, point: &PricePoint) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::insert_into(price_history::table)
            .values(NewPriceRow::from_domain(point))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn append_bid(&self, point: &BidPoint) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::insert_into(bid_history::table)
            .values(NewBidRow::from_domain(point))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn link_search_item(&self, search_id: i64, item_id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        // Re-discovery of the same item by the same search is a no-op.
        diesel::insert_or_ignore_into(search_items::table)
            .values((
                search_items::search_id.eq(search_id),
                search_items::item_id.eq(item_id),
                search_items::first_matched_at.eq(Utc::now().to_rfc3339()),
            ))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for SqliteStore {
    async fn active_identities(&self) -> Result<Vec<ClientIdentity>> {
        let mut conn = self.conn()?;
        let rows: Vec<IdentityRow> = client_identities::table
            .filter(client_identities::active.eq(1))
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.into_iter().map(IdentityRow::into_domain).collect())
    }

    async fn random_identity(&self) -> Result<ClientIdentity> {
        let identities = self.active_identities().await?;
        identities
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(Error::NotFound {
                entity: "client_identity",
                id: "any".to_string(),
            })
    }

    async fn bump_identity_usage(&self, id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::update(client_identities::table.find(id))
            .set(client_identities::usage_count.eq(client_identities::usage_count + 1))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ExecutionStore for SqliteStore {
    async fn record_execution(&self, execution: &SearchExecution) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::replace_into(search_executions::table)
            .values(ExecutionRow::from_domain(execution))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }
}

impl SqliteStore {
    /// Seed a client identity row, returning its id. Operator tooling and
    /// test setup.
    pub fn insert_identity(&self, user_agent: &str) -> Result<i64> {
        let mut conn = self.conn()?;
        diesel::insert_into(client_identities::table)
            .values((
                client_identities::user_agent.eq(user_agent),
                client_identities::usage_count.eq(0),
                client_identities::active.eq(1),
            ))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        diesel::select(last_insert_rowid())
            .get_result(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// Load the execution audit rows for a search, newest first.
    pub fn executions_for_search(&self, search_id: i64) -> Result<Vec<SearchExecution>> {
        let mut conn = self.conn()?;
        let rows: Vec<ExecutionRow> = search_executions::table
            .filter(search_executions::search_id.eq(search_id))
            .order(search_executions::started_at.desc())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        rows.into_iter().map(ExecutionRow::into_domain).collect()
    }
}
