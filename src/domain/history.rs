//! Price and bid history rows appended as listings change.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single observed price for an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub item_id: i64,
    pub price: Decimal,
    pub recorded_at: DateTime<Utc>,
}

impl PricePoint {
    pub fn now(item_id: i64, price: Decimal) -> Self {
        Self {
            item_id,
            price,
            recorded_at: Utc::now(),
        }
    }
}

/// A single observed bid count for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidPoint {
    pub item_id: i64,
    pub bid_count: i64,
    pub recorded_at: DateTime<Utc>,
}

impl BidPoint {
    pub fn now(item_id: i64, bid_count: i64) -> Self {
        Self {
            item_id,
            bid_count,
            recorded_at: Utc::now(),
        }
    }
}
