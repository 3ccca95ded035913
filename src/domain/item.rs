//! Marketplace listings and the persisted items derived from them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a stored item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Listing is live and tracked.
    Active,
    /// Collapsed into a canonical item by the deduplication engine.
    Merged,
    /// Auction has closed.
    Ended,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::Merged => "merged",
            ItemStatus::Ended => "ended",
        }
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ItemStatus::Active),
            "merged" => Ok(ItemStatus::Merged),
            "ended" => Ok(ItemStatus::Ended),
            other => Err(format!("unknown item status: {other}")),
        }
    }
}

/// A raw listing as returned by the marketplace client, before persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Marketplace-assigned listing id.
    pub external_id: String,
    pub title: String,
    pub seller: String,
    #[serde(default)]
    pub description: String,
    pub current_price: Decimal,
    #[serde(default)]
    pub bid_count: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Listing {
    /// Convert into an unsaved [`Item`] first seen at `now`.
    pub fn into_item(self, now: DateTime<Utc>) -> Item {
        Item {
            id: 0,
            external_id: self.external_id,
            title: self.title,
            seller: self.seller,
            description: self.description,
            current_price: self.current_price,
            bid_count: self.bid_count,
            image_url: self.image_url,
            category: self.category,
            subcategory: self.subcategory,
            location: self.location,
            url: self.url,
            status: ItemStatus::Active,
            first_seen: now,
            last_seen: now,
        }
    }
}

/// A persisted marketplace item keyed by its external id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Store-assigned row id; 0 until first persisted.
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub seller: String,
    pub description: String,
    pub current_price: Decimal,
    pub bid_count: i64,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub status: ItemStatus,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn listing_converts_to_active_item() {
        let listing = Listing {
            external_id: "ext-1".into(),
            title: "Vintage Camera".into(),
            seller: "shopco".into(),
            description: "Nice camera".into(),
            current_price: dec!(24.99),
            bid_count: 3,
            image_url: None,
            category: Some("Electronics".into()),
            subcategory: None,
            location: None,
            url: None,
        };
        let now = Utc::now();
        let item = listing.into_item(now);

        assert_eq!(item.id, 0);
        assert_eq!(item.status, ItemStatus::Active);
        assert_eq!(item.first_seen, now);
        assert_eq!(item.last_seen, now);
        assert_eq!(item.current_price, dec!(24.99));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [ItemStatus::Active, ItemStatus::Merged, ItemStatus::Ended] {
            assert_eq!(status.as_str().parse::<ItemStatus>().unwrap(), status);
        }
    }
}
