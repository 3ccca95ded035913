//! End-to-end ingest flow: search, diff against the store, deduplicate.

mod support;

use std::sync::Arc;
use std::time::Duration;

use bidwatch::domain::{ExecutionStatus, ItemStatus};
use bidwatch::port::SearchPage;
use bidwatch::testkit::{item, listing, search, MemoryStore, ScriptedClient};
use rust_decimal_macros::dec;

async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn known_items_refresh_and_unseen_items_insert() {
    let store = Arc::new(MemoryStore::new());
    let saved = store.add_search(search(0, "vintage camera"));

    // Seed a known item at the old price, bypassing ingest.
    let mut existing = item("ext-1", "Vintage Camera 35mm", dec!(20.00));
    existing.seller = "camerashop".into();
    let existing_id = {
        use bidwatch::port::ItemStore;
        store.insert_item(&existing).await.unwrap()
    };

    let page = SearchPage {
        listings: vec![
            // Same external id, price moved 20.00 -> 25.00.
            {
                let mut relisted = listing("ext-1", "Vintage Camera 35mm", dec!(25.00));
                relisted.seller = "camerashop".into();
                relisted
            },
            // Never seen before.
            listing("ext-2", "Antique Radio", dec!(12.50)),
        ],
        total: 2,
    };
    let client = ScriptedClient::new().with_results(vec![Ok(page)]);
    let (scheduler, signal, _shutdown) =
        support::scheduler(store.clone(), client, support::fast_scheduler_config());

    let engine = tokio::spawn(scheduler.clone().run());
    scheduler.trigger_search(saved.id).await.unwrap();
    settle().await;
    signal.trigger();
    let _ = engine.await;

    // The known item was refreshed in place, never duplicated.
    assert_eq!(store.item_count(), 2);
    let items = store.items();
    let refreshed = items.iter().find(|i| i.external_id == "ext-1").unwrap();
    assert_eq!(refreshed.current_price, dec!(25.00));
    assert_eq!(refreshed.id, existing_id);

    // Exactly one price row from the change; seeding wrote none.
    assert_eq!(store.price_rows_for(existing_id).len(), 1);
    assert_eq!(store.price_rows_for(existing_id)[0].price, dec!(25.00));

    // The unseen item got an initial price row and a search association.
    let inserted = items.iter().find(|i| i.external_id == "ext-2").unwrap();
    assert_eq!(store.price_rows_for(inserted.id).len(), 1);
    assert!(store.links().contains(&(saved.id, inserted.id)));

    let executions = store.executions();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].status, ExecutionStatus::Completed);
    assert_eq!(executions[0].items_found, 2);
    assert_eq!(executions[0].new_items_found, 1);
}

#[tokio::test]
async fn changed_bid_count_appends_one_bid_row() {
    let store = Arc::new(MemoryStore::new());
    let saved = store.add_search(search(0, "vintage camera"));

    let existing = item("ext-1", "Vintage Camera 35mm", dec!(20.00));
    let existing_id = {
        use bidwatch::port::ItemStore;
        store.insert_item(&existing).await.unwrap()
    };

    // Same external id and price; only the bid count moved.
    let page = SearchPage {
        listings: vec![{
            let mut bid_on = listing("ext-1", "Vintage Camera 35mm", dec!(20.00));
            bid_on.bid_count = 3;
            bid_on
        }],
        total: 1,
    };
    let client = ScriptedClient::new().with_results(vec![Ok(page)]);
    let (scheduler, signal, _shutdown) =
        support::scheduler(store.clone(), client, support::fast_scheduler_config());

    let engine = tokio::spawn(scheduler.clone().run());
    scheduler.trigger_search(saved.id).await.unwrap();
    settle().await;
    signal.trigger();
    let _ = engine.await;

    let refreshed = store
        .items()
        .into_iter()
        .find(|i| i.external_id == "ext-1")
        .unwrap();
    assert_eq!(refreshed.bid_count, 3);

    // One bid row from the change; the unchanged price wrote no price row.
    let bid_rows = store.bid_rows_for(existing_id);
    assert_eq!(bid_rows.len(), 1);
    assert_eq!(bid_rows[0].bid_count, 3);
    assert!(store.price_rows_for(existing_id).is_empty());
}

#[tokio::test]
async fn store_fault_records_failure_without_wedging_the_scheduler() {
    let store = Arc::new(MemoryStore::new());
    let saved = store.add_search(search(0, "vintage camera"));

    let page = || SearchPage {
        listings: vec![listing("ext-1", "Vintage Camera 35mm", dec!(20.00))],
        total: 1,
    };
    let client = ScriptedClient::new().with_results(vec![Ok(page()), Ok(page())]);
    let (scheduler, signal, _shutdown) =
        support::scheduler(store.clone(), client, support::fast_scheduler_config());
    let engine = tokio::spawn(scheduler.clone().run());

    // First execution hits a broken item table.
    store.fail_item_ops(true);
    scheduler.trigger_search(saved.id).await.unwrap();
    settle().await;
    assert_eq!(store.item_count(), 0);

    // The fault stays isolated to that execution; once the store recovers
    // the next trigger runs through.
    store.fail_item_ops(false);
    scheduler.trigger_search(saved.id).await.unwrap();
    settle().await;
    signal.trigger();
    let _ = engine.await;

    let executions = store.executions();
    assert_eq!(executions.len(), 2);
    assert_eq!(executions[0].status, ExecutionStatus::Failed);
    assert!(executions[0]
        .error
        .as_deref()
        .unwrap()
        .contains("item table unavailable"));
    assert_eq!(executions[1].status, ExecutionStatus::Completed);
    assert_eq!(store.item_count(), 1);
}

#[tokio::test]
async fn relisted_item_merges_into_canonical() {
    let store = Arc::new(MemoryStore::new());
    let saved = store.add_search(search(0, "vintage camera"));

    // Canonical row: same title/seller/price, different external id.
    let mut canonical = item("ext-old", "Vintage Camera 35mm", dec!(19.99));
    canonical.seller = "camerashop".into();
    canonical.description = "classic rangefinder, working".into();
    let canonical_id = {
        use bidwatch::port::ItemStore;
        store.insert_item(&canonical).await.unwrap()
    };

    let page = SearchPage {
        listings: vec![{
            let mut relisted = listing("ext-new", "Vintage Camera 35mm", dec!(19.99));
            relisted.seller = "camerashop".into();
            relisted.description = "classic rangefinder, working".into();
            relisted
        }],
        total: 1,
    };
    let client = ScriptedClient::new().with_results(vec![Ok(page)]);
    let (scheduler, signal, _shutdown) =
        support::scheduler(store.clone(), client, support::fast_scheduler_config());

    let engine = tokio::spawn(scheduler.clone().run());
    scheduler.trigger_search(saved.id).await.unwrap();
    settle().await;
    signal.trigger();
    let _ = engine.await;

    let items = store.items();
    assert_eq!(items.len(), 2);

    let canonical = items.iter().find(|i| i.id == canonical_id).unwrap();
    assert_eq!(canonical.status, ItemStatus::Active);

    // The relisting was inserted, then collapsed into the canonical row.
    let merged = items.iter().find(|i| i.external_id == "ext-new").unwrap();
    assert_eq!(merged.status, ItemStatus::Merged);
}

#[tokio::test]
async fn empty_result_page_completes_without_items() {
    let store = Arc::new(MemoryStore::new());
    let saved = store.add_search(search(0, "nothing here"));

    let client = ScriptedClient::new().with_results(vec![Ok(SearchPage::default())]);
    let (scheduler, signal, _shutdown) =
        support::scheduler(store.clone(), client, support::fast_scheduler_config());

    let engine = tokio::spawn(scheduler.clone().run());
    scheduler.trigger_search(saved.id).await.unwrap();
    settle().await;
    signal.trigger();
    let _ = engine.await;

    assert_eq!(store.item_count(), 0);
    let executions = store.executions();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].status, ExecutionStatus::Completed);
    assert_eq!(executions[0].items_found, 0);
}
