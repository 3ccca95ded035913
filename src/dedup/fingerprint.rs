//! Deterministic item fingerprints.
//!
//! Each text field is normalized (lowercased, non-alphanumerics stripped,
//! whitespace collapsed) and digested independently, plus a combined digest
//! over the concatenation. Identical normalized input always yields the same
//! fingerprint; empty fields fingerprint to the empty string so comparisons
//! can tell "missing" apart from "present".

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::domain::Item;

/// Derived per-field digests for an item. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFingerprint {
    pub title: String,
    pub seller: String,
    pub price: String,
    pub description: String,
    pub combined: String,
}

impl ItemFingerprint {
    /// Fingerprint an item. Pure function of the item's fields.
    pub fn of(item: &Item) -> Self {
        let title = normalize(&item.title);
        let seller = normalize(&item.seller);
        let description = normalize(&item.description);
        let price = price_key(item.current_price);

        let combined_input = format!("{title}|{seller}|{price}|{description}");
        Self {
            title: hash_field(&title),
            seller: hash_field(&seller),
            price: price.clone(),
            description: hash_field(&description),
            combined: hash_field(&combined_input),
        }
    }
}

/// Lowercase, strip non-alphanumerics, collapse runs of whitespace.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true;
    for c in text.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_alphanumeric() {
            out.push(c);
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Price fingerprint: the value rounded to two decimals, as a string.
pub fn price_key(price: Decimal) -> String {
    format!("{:.2}", price.round_dp(2))
}

fn hash_field(normalized: &str) -> String {
    if normalized.is_empty() {
        return String::new();
    }
    let digest = Sha256::digest(normalized.as_bytes());
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemStatus, Listing};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn item(title: &str, seller: &str, description: &str, price: Decimal) -> Item {
        Listing {
            external_id: "x".into(),
            title: title.into(),
            seller: seller.into(),
            description: description.into(),
            current_price: price,
            bid_count: 0,
            image_url: None,
            category: None,
            subcategory: None,
            location: None,
            url: None,
        }
        .into_item(Utc::now())
    }

    #[test]
    fn normalize_strips_and_collapses() {
        assert_eq!(normalize("  Vintage -- CAMERA!!  (35mm) "), "vintage camera 35mm");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("!!!"), "");
    }

    #[test]
    fn identical_input_yields_identical_fingerprint() {
        let a = item("Vintage Camera", "shopco", "works great", dec!(19.99));
        let b = item("vintage CAMERA!", "ShopCo", "works, great", dec!(19.99));
        assert_eq!(ItemFingerprint::of(&a), ItemFingerprint::of(&b));
    }

    #[test]
    fn different_titles_differ() {
        let a = item("Vintage Camera", "shopco", "", dec!(19.99));
        let b = item("Antique Radio", "shopco", "", dec!(19.99));
        let (fa, fb) = (ItemFingerprint::of(&a), ItemFingerprint::of(&b));
        assert_ne!(fa.title, fb.title);
        assert_ne!(fa.combined, fb.combined);
        assert_eq!(fa.seller, fb.seller);
    }

    #[test]
    fn empty_fields_fingerprint_empty() {
        let a = item("Camera", "shopco", "", dec!(1));
        assert!(ItemFingerprint::of(&a).description.is_empty());
    }

    #[test]
    fn price_rounds_to_two_decimals() {
        assert_eq!(price_key(dec!(19.999)), "20.00");
        assert_eq!(price_key(dec!(19.99)), "19.99");
        assert_eq!(price_key(dec!(5)), "5.00");
    }

    #[test]
    fn fingerprint_ignores_status_and_timestamps() {
        let mut a = item("Camera", "shopco", "desc", dec!(10));
        let fp = ItemFingerprint::of(&a);
        a.status = ItemStatus::Merged;
        a.bid_count = 99;
        assert_eq!(ItemFingerprint::of(&a), fp);
    }
}
