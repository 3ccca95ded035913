//! Fuzzy duplicate detection and merging.
//!
//! Similarity is a weighted sum of per-field scores. Text fields are
//! compared through their fingerprint digests using a prefix/suffix
//! character-overlap ratio — a coarse tie-breaker, not true fuzzy text
//! matching, kept deliberately (see DESIGN.md). An exact combined
//! fingerprint match is always a duplicate regardless of threshold.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::DedupConfig;
use crate::dedup::fingerprint::ItemFingerprint;
use crate::domain::{Item, ItemStatus, PricePoint};
use crate::error::Result;
use crate::port::ItemStore;

/// Minimum hash-overlap ratio; anything lower scores zero.
const MIN_TEXT_OVERLAP: f64 = 0.3;

/// A candidate duplicate with its similarity score.
#[derive(Debug, Clone)]
pub struct DuplicateMatch {
    pub item: Item,
    pub score: f64,
}

/// Heuristic similarity scorer over recently seen items.
pub struct DeduplicationEngine {
    store: Arc<dyn ItemStore>,
    config: DedupConfig,
}

impl DeduplicationEngine {
    pub fn new(store: Arc<dyn ItemStore>, config: DedupConfig) -> Self {
        Self { store, config }
    }

    /// Weighted similarity of two items in [0, 1] for default weights.
    pub fn similarity(&self, a: &Item, b: &Item) -> f64 {
        let fa = ItemFingerprint::of(a);
        let fb = ItemFingerprint::of(b);
        self.similarity_of(&fa, a.current_price, &fb, b.current_price)
    }

    fn similarity_of(
        &self,
        fa: &ItemFingerprint,
        price_a: Decimal,
        fb: &ItemFingerprint,
        price_b: Decimal,
    ) -> f64 {
        let w = &self.config.weights;
        w.title * text_similarity(&fa.title, &fb.title)
            + w.seller * text_similarity(&fa.seller, &fb.seller)
            + w.price * self.price_similarity(price_a, price_b)
            + w.description * text_similarity(&fa.description, &fb.description)
    }

    /// Price similarity: 1.0 when equal, otherwise the complement of the
    /// relative difference when within the configured bound, else 0.
    pub fn price_similarity(&self, a: Decimal, b: Decimal) -> f64 {
        if a == b {
            return 1.0;
        }
        let avg = (a + b) / Decimal::TWO;
        if avg.is_zero() {
            return 0.0;
        }
        let diff = ((a - b).abs() / avg).to_f64().unwrap_or(f64::INFINITY);
        if diff <= self.config.max_price_diff_pct {
            1.0 - diff
        } else {
            0.0
        }
    }

    /// Find stored items that look like duplicates of `item`.
    ///
    /// The comparison set is bounded by the max-age window and result cap.
    /// Matches are sorted oldest-first so the head is the natural canonical
    /// item. The item's own external id is never reported.
    pub async fn check_for_duplicates(&self, item: &Item) -> Result<Vec<DuplicateMatch>> {
        let fp = ItemFingerprint::of(item);
        let candidates = self
            .store
            .recent_items(self.config.max_age(), self.config.recent_limit)
            .await?;

        let mut matches = Vec::new();
        for candidate in candidates {
            if candidate.external_id == item.external_id {
                continue;
            }
            if candidate.status == ItemStatus::Merged {
                continue;
            }
            let cfp = ItemFingerprint::of(&candidate);
            if cfp.combined == fp.combined {
                matches.push(DuplicateMatch {
                    item: candidate,
                    score: 1.0,
                });
                continue;
            }
            // All three primary fingerprints differing rules out a match
            // without paying for the full similarity computation.
            if cfp.title != fp.title && cfp.seller != fp.seller && cfp.price != fp.price {
                continue;
            }
            let score =
                self.similarity_of(&fp, item.current_price, &cfp, candidate.current_price);
            if score >= self.config.similarity_threshold {
                debug!(
                    external_id = %item.external_id,
                    candidate = %candidate.external_id,
                    score,
                    "duplicate candidate"
                );
                matches.push(DuplicateMatch {
                    item: candidate,
                    score,
                });
            }
        }

        matches.sort_by_key(|m| m.item.first_seen);
        Ok(matches)
    }

    /// Merge duplicates into a canonical item.
    ///
    /// Backfills the canonical item's empty image/category/subcategory/
    /// location from the duplicates, keeps the longer description, records a
    /// price-history row for any duplicate whose price differs, and flips
    /// each duplicate's status to [`ItemStatus::Merged`].
    pub async fn merge_duplicate_items(
        &self,
        canonical: &mut Item,
        duplicates: Vec<Item>,
    ) -> Result<()> {
        for mut duplicate in duplicates {
            if canonical.image_url.is_none() && duplicate.image_url.is_some() {
                canonical.image_url = duplicate.image_url.clone();
            }
            if canonical.category.is_none() && duplicate.category.is_some() {
                canonical.category = duplicate.category.clone();
            }
            if canonical.subcategory.is_none() && duplicate.subcategory.is_some() {
                canonical.subcategory = duplicate.subcategory.clone();
            }
            if canonical.location.is_none() && duplicate.location.is_some() {
                canonical.location = duplicate.location.clone();
            }
            if duplicate.description.len() > canonical.description.len() {
                canonical.description = duplicate.description.clone();
            }
            if duplicate.current_price != canonical.current_price {
                self.store
                    .append_price(&PricePoint::now(canonical.id, duplicate.current_price))
                    .await?;
            }

            duplicate.status = ItemStatus::Merged;
            duplicate.last_seen = Utc::now();
            self.store.update_item(&duplicate).await?;
            info!(
                canonical = %canonical.external_id,
                merged = %duplicate.external_id,
                "merged duplicate item"
            );
        }

        self.store.update_item(canonical).await?;
        Ok(())
    }
}

/// Similarity of two fingerprint digests.
///
/// 1.0 when equal; 0.0 when exactly one is empty; otherwise the combined
/// common-prefix and common-suffix length over the digest length, floored to
/// 0 below [`MIN_TEXT_OVERLAP`].
fn text_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let ab = a.as_bytes();
    let bb = b.as_bytes();
    let shorter = ab.len().min(bb.len());

    let prefix = ab.iter().zip(bb.iter()).take_while(|(x, y)| x == y).count();
    let suffix = ab
        .iter()
        .rev()
        .zip(bb.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
        .min(shorter - prefix);

    let ratio = (prefix + suffix) as f64 / ab.len().max(bb.len()) as f64;
    if ratio < MIN_TEXT_OVERLAP {
        0.0
    } else {
        ratio
    }
}
