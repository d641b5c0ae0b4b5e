//! End-to-end facade behavior across restarts, outages and overlapping refreshes.

use std::sync::Arc;

use finmate_common::CurrencyCatalog;
use finmate_fx::{
    CurrencyFacade, FeedResponse, FetchError, FileStore, FlakyStore, FxConfig, FxError,
    KeyValueStore, MemoryStore, MockRateFeed,
};

fn facade_with(feed: Arc<MockRateFeed>, store: Arc<dyn KeyValueStore>) -> Arc<CurrencyFacade> {
    Arc::new(CurrencyFacade::new(
        CurrencyCatalog::default(),
        feed,
        store,
        &FxConfig::default(),
    ))
}

#[tokio::test]
async fn selection_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("finmate.json");

    let feed = Arc::new(MockRateFeed::new("feed"));
    feed.set_rates([("USD", 0.012)]);

    let first = facade_with(feed.clone(), Arc::new(FileStore::new(&path)));
    first.initialize().await.await.unwrap();
    first.select_currency("USD").await.unwrap();
    drop(first);

    let restarted = facade_with(feed, Arc::new(FileStore::new(&path)));
    restarted.initialize().await.await.unwrap();

    assert_eq!(restarted.selected_currency().code, "USD");
}

#[tokio::test]
async fn cached_rates_used_when_offline_after_restart() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

    let online = Arc::new(MockRateFeed::new("online"));
    online.set_rates([("USD", 0.012), ("EUR", 0.011)]);
    let first = facade_with(online, store.clone());
    first.initialize().await.await.unwrap();
    let fetched_at = first.rates_last_updated().unwrap();

    let offline = Arc::new(MockRateFeed::new("offline"));
    offline.set_error(FetchError::Transport("network unreachable".into()));
    let restarted = facade_with(offline.clone(), store);
    restarted.initialize().await.await.unwrap();
    restarted.select_currency("EUR").await.unwrap();

    assert_eq!(offline.calls(), 1);
    assert_eq!(restarted.rates_last_updated(), Some(fetched_at));
    assert!((restarted.convert_amount(1000.0, None) - 11.0).abs() < 1e-9);
    assert_eq!(restarted.format_amount(1000.0, None), "€11.00");
}

#[tokio::test]
async fn failed_refresh_writes_nothing() {
    let feed = Arc::new(MockRateFeed::new("feed"));
    let store = Arc::new(FlakyStore::new());
    let facade = facade_with(feed.clone(), store.clone());

    feed.set_rates([("USD", 0.012)]);
    facade.initialize().await.await.unwrap();
    let before = facade.snapshot();
    let writes = store.writes();

    for err in [
        FetchError::Status { status: 404 },
        FetchError::Decode("expected value at line 1".into()),
        FetchError::EmptyRates,
    ] {
        feed.push(Err(err.clone()));
        let result = facade.refresh_rates().await;
        assert_eq!(result.unwrap_err(), FxError::from(err));
    }
    feed.push(Ok(FeedResponse::new([("INR", 1.0)])));
    assert!(facade.refresh_rates().await.is_err());

    assert_eq!(facade.snapshot(), before);
    assert_eq!(store.writes(), writes);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn overlapping_refreshes_commit_whole_tables() {
    let feed = Arc::new(MockRateFeed::new("feed"));
    let facade = facade_with(feed.clone(), Arc::new(MemoryStore::new()));

    feed.push(Ok(FeedResponse::new([("USD", 0.012), ("EUR", 0.011)])));
    feed.push(Ok(FeedResponse::new([("GBP", 0.0095), ("JPY", 1.8)])));
    feed.hold();

    let a = tokio::spawn({
        let facade = facade.clone();
        async move { facade.refresh_rates().await }
    });
    feed.wait_for_calls(1).await;
    let b = tokio::spawn({
        let facade = facade.clone();
        async move { facade.refresh_rates().await }
    });

    // Reads during the in-flight refresh see the previous table.
    assert!(facade.snapshot().table.is_pivot_only());
    assert_eq!(facade.convert_amount(100.0, Some("USD")), 100.0);

    feed.release();
    let first = a.await.unwrap().unwrap();
    let second = b.await.unwrap().unwrap();

    let current = facade.snapshot();
    assert!(current == first || current == second);
    let has_first = current.table.contains("USD") || current.table.contains("EUR");
    let has_second = current.table.contains("GBP") || current.table.contains("JPY");
    assert!(has_first != has_second, "tables were merged: {current:?}");
    assert_eq!(feed.calls(), 2);
}

#[tokio::test]
async fn reinitialize_against_same_store_keeps_state() {
    let feed = Arc::new(MockRateFeed::new("feed"));
    feed.set_rates([("SGD", 0.016)]);
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

    let facade = facade_with(feed.clone(), store.clone());
    facade.initialize().await.await.unwrap();
    facade.select_currency("SGD").await.unwrap();

    let again = facade_with(feed, store);
    let pending = again.initialize().await;
    assert_eq!(again.selected_currency().code, "SGD");
    assert_eq!(again.snapshot().table.get("SGD"), Some(0.016));
    pending.await.unwrap();

    assert_eq!(again.format_amount(10_000.0, None), "S$160.00");
}
