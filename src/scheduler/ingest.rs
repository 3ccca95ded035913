//! Result ingest: diffing a result page against the store.
//!
//! Listings whose external id is already stored get their history refreshed;
//! unseen listings go through the deduplication engine before insert and are
//! merged into the oldest matching canonical item when duplicates exist.

use chrono::Utc;
use tracing::{debug, info};

use crate::domain::{BidPoint, Item, Listing, PricePoint, Search};
use crate::error::Result;
use crate::port::{MarketplaceClient, SearchPage};
use crate::scheduler::Scheduler;

impl<C: MarketplaceClient + 'static> Scheduler<C> {
    /// Persist one page of results, returning the number of new items.
    pub(super) async fn ingest_results(&self, search: &Search, page: SearchPage) -> Result<i64> {
        let mut new_items = 0;
        for listing in page.listings {
            let existing = self
                .store
                .get_item_by_external_id(&listing.external_id)
                .await?;
            match existing {
                Some(item) => self.refresh_existing(item, listing).await?,
                None => {
                    self.ingest_new(search, listing).await?;
                    new_items += 1;
                }
            }
        }
        Ok(new_items)
    }

    /// Update a known item in place, appending history rows for changes.
    async fn refresh_existing(&self, mut item: Item, listing: Listing) -> Result<()> {
        let price_changed = listing.current_price != item.current_price;
        let bids_changed = listing.bid_count != item.bid_count;

        if price_changed {
            debug!(
                external_id = %item.external_id,
                old = %item.current_price,
                new = %listing.current_price,
                "price changed"
            );
            item.current_price = listing.current_price;
            self.store
                .append_price(&PricePoint::now(item.id, item.current_price))
                .await?;
        }
        if bids_changed {
            item.bid_count = listing.bid_count;
            self.store
                .append_bid(&BidPoint::now(item.id, item.bid_count))
                .await?;
        }

        item.last_seen = Utc::now();
        self.store.update_item(&item).await?;
        Ok(())
    }

    /// Insert an unseen listing, then fold it into a canonical duplicate if
    /// the deduplication engine finds one.
    ///
    /// Insert happens before the merge so a crash mid-merge leaves the new
    /// row present rather than lost.
    async fn ingest_new(&self, search: &Search, listing: Listing) -> Result<()> {
        let mut item = listing.into_item(Utc::now());
        let duplicates = self.dedup.check_for_duplicates(&item).await?;

        item.id = self.store.insert_item(&item).await?;
        self.store
            .append_price(&PricePoint::now(item.id, item.current_price))
            .await?;
        self.store.link_search_item(search.id, item.id).await?;
        info!(
            search_id = search.id,
            external_id = %item.external_id,
            price = %item.current_price,
            "new item stored"
        );

        if let Some(oldest) = duplicates.first() {
            // Oldest match is the canonical item; the new row is merged
            // into it alongside any other matches.
            let mut canonical = oldest.item.clone();
            let mut to_merge = vec![item];
            to_merge.extend(duplicates.into_iter().skip(1).map(|m| m.item));
            self.dedup
                .merge_duplicate_items(&mut canonical, to_merge)
                .await?;
        }
        Ok(())
    }
}
