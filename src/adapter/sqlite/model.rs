//! Database model types for Diesel ORM.
//!
//! Timestamps are stored as RFC 3339 strings and prices as decimal strings;
//! parse failures surface as [`Error::Parse`].

use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::schema::{bid_history, client_identities, items, price_history, search_executions, searches};
use crate::domain::{
    BidPoint, ClientIdentity, ExecutionStatus, Item, ItemStatus, PricePoint, Search,
    SearchExecution,
};
use crate::error::{Error, Result};

pub(super) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("timestamp {raw:?}: {e}")))
}

pub(super) fn parse_decimal(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).map_err(|e| Error::Parse(format!("decimal {raw:?}: {e}")))
}

/// Database row for a saved search.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = searches)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SearchRow {
    pub id: i64,
    pub name: String,
    pub query: String,
    pub category: Option<String>,
    pub max_price: Option<String>,
    pub enabled: i32,
    pub notify_threshold: Option<String>,
    pub created_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = searches)]
pub struct NewSearchRow {
    pub name: String,
    pub query: String,
    pub category: Option<String>,
    pub max_price: Option<String>,
    pub enabled: i32,
    pub notify_threshold: Option<String>,
    pub created_at: String,
}

impl NewSearchRow {
    pub fn from_domain(search: &Search) -> Self {
        Self {
            name: search.name.clone(),
            query: search.query.clone(),
            category: search.category.clone(),
            max_price: search.max_price.map(|p| p.to_string()),
            enabled: i32::from(search.enabled),
            notify_threshold: search.notify_threshold.map(|p| p.to_string()),
            created_at: search.created_at.to_rfc3339(),
        }
    }
}

impl SearchRow {
    pub fn into_domain(self) -> Result<Search> {
        Ok(Search {
            id: self.id,
            name: self.name,
            query: self.query,
            category: self.category,
            max_price: self.max_price.as_deref().map(parse_decimal).transpose()?,
            enabled: self.enabled != 0,
            notify_threshold: self
                .notify_threshold
                .as_deref()
                .map(parse_decimal)
                .transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// Database row for a marketplace item.
#[derive(Queryable, Selectable, AsChangeset, Debug, Clone)]
#[diesel(table_name = items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ItemRow {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub seller: String,
    pub description: String,
    pub current_price: String,
    pub bid_count: i64,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub status: String,
    pub first_seen: String,
    pub last_seen: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = items)]
pub struct NewItemRow {
    pub external_id: String,
    pub title: String,
    pub seller: String,
    pub description: String,
    pub current_price: String,
    pub bid_count: i64,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub status: String,
    pub first_seen: String,
    pub last_seen: String,
}

impl NewItemRow {
    pub fn from_domain(item: &Item) -> Self {
        Self {
            external_id: item.external_id.clone(),
            title: item.title.clone(),
            seller: item.seller.clone(),
            description: item.description.clone(),
            current_price: item.current_price.to_string(),
            bid_count: item.bid_count,
            image_url: item.image_url.clone(),
            category: item.category.clone(),
            subcategory: item.subcategory.clone(),
            location: item.location.clone(),
            url: item.url.clone(),
            status: item.status.as_str().to_string(),
            first_seen: item.first_seen.to_rfc3339(),
            last_seen: item.last_seen.to_rfc3339(),
        }
    }
}

impl ItemRow {
    pub fn from_domain(item: &Item) -> Self {
        Self {
            id: item.id,
            external_id: item.external_id.clone(),
            title: item.title.clone(),
            seller: item.seller.clone(),
            description: item.description.clone(),
            current_price: item.current_price.to_string(),
            bid_count: item.bid_count,
            image_url: item.image_url.clone(),
            category: item.category.clone(),
            subcategory: item.subcategory.clone(),
            location: item.location.clone(),
            url: item.url.clone(),
            status: item.status.as_str().to_string(),
            first_seen: item.first_seen.to_rfc3339(),
            last_seen: item.last_seen.to_rfc3339(),
        }
    }

    pub fn into_domain(self) -> Result<Item> {
        Ok(Item {
            id: self.id,
            external_id: self.external_id,
            title: self.title,
            seller: self.seller,
            description: self.description,
            current_price: parse_decimal(&self.current_price)?,
            bid_count: self.bid_count,
            image_url: self.image_url,
            category: self.category,
            subcategory: self.subcategory,
            location: self.location,
            url: self.url,
            status: ItemStatus::from_str(&self.status).map_err(Error::Parse)?,
            first_seen: parse_timestamp(&self.first_seen)?,
            last_seen: parse_timestamp(&self.last_seen)?,
        })
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = price_history)]
pub struct NewPriceRow {
    pub item_id: i64,
    pub price: String,
    pub recorded_at: String,
}

impl NewPriceRow {
    pub fn from_domain(point: &PricePoint) -> Self {
        Self {
            item_id: point.item_id,
            price: point.price.to_string(),
            recorded_at: point.recorded_at.to_rfc3339(),
        }
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = bid_history)]
pub struct NewBidRow {
    pub item_id: i64,
    pub bid_count: i64,
    pub recorded_at: String,
}

impl NewBidRow {
    pub fn from_domain(point: &BidPoint) -> Self {
        Self {
            item_id: point.item_id,
            bid_count: point.bid_count,
            recorded_at: point.recorded_at.to_rfc3339(),
        }
    }
}

/// Database row for a client identity.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = client_identities)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct IdentityRow {
    pub id: i64,
    pub user_agent: String,
    pub usage_count: i64,
    pub active: i32,
}

impl IdentityRow {
    pub fn into_domain(self) -> ClientIdentity {
        ClientIdentity {
            id: self.id,
            user_agent: self.user_agent,
            usage_count: self.usage_count,
            active: self.active != 0,
        }
    }
}

/// Database row for an execution audit record, upserted by uuid.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = search_executions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ExecutionRow {
    pub id: String,
    pub search_id: i64,
    pub status: String,
    pub items_found: i64,
    pub new_items_found: i64,
    pub error: Option<String>,
    pub started_at: String,
    pub duration_ms: Option<i64>,
}

impl ExecutionRow {
    pub fn from_domain(execution: &SearchExecution) -> Self {
        Self {
            id: execution.id.to_string(),
            search_id: execution.search_id,
            status: execution.status.as_str().to_string(),
            items_found: execution.items_found,
            new_items_found: execution.new_items_found,
            error: execution.error.clone(),
            started_at: execution.started_at.to_rfc3339(),
            duration_ms: execution.duration_ms,
        }
    }

    pub fn into_domain(self) -> Result<SearchExecution> {
        Ok(SearchExecution {
            id: Uuid::parse_str(&self.id).map_err(|e| Error::Parse(e.to_string()))?,
            search_id: self.search_id,
            status: ExecutionStatus::from_str(&self.status).map_err(Error::Parse)?,
            items_found: self.items_found,
            new_items_found: self.new_items_found,
            error: self.error,
            started_at: parse_timestamp(&self.started_at)?,
            duration_ms: self.duration_ms,
        })
    }
}
