//! Builders for domain primitives used across tests.

use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::{Item, Listing, Search};

/// An enabled search with the given id and query.
pub fn search(id: i64, query: &str) -> Search {
    Search {
        id,
        ..Search::new(format!("search-{id}"), query)
    }
}

/// A listing with the given external id, title, and price.
pub fn listing(external_id: &str, title: &str, price: Decimal) -> Listing {
    Listing {
        external_id: external_id.into(),
        title: title.into(),
        seller: "seller-one".into(),
        description: String::new(),
        current_price: price,
        bid_count: 0,
        image_url: None,
        category: None,
        subcategory: None,
        location: None,
        url: None,
    }
}

/// An unsaved item derived from [`listing`].
pub fn item(external_id: &str, title: &str, price: Decimal) -> Item {
    listing(external_id, title, price).into_item(Utc::now())
}
