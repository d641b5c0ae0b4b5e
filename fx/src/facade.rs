//! Entry point for display layers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use finmate_common::{Currency, CurrencyCatalog, Grouping, RateSnapshot};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheStats, RateCache};
use crate::config::{FxConfig, StorageKeys};
use crate::conversion;
use crate::error::{FxError, FxResult};
use crate::feed::{HttpRateFeed, RateFeed};
use crate::store::{FileStore, KeyValueStore, MemoryStore};

/// Selected display currency plus cached rates, behind one handle.
///
/// Construct once at the application root, wrap in an [`Arc`], call
/// [`CurrencyFacade::initialize`], and share the `Arc` with consumers.
pub struct CurrencyFacade {
    catalog: CurrencyCatalog,
    cache: RateCache,
    store: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
    grouping: Grouping,
    selected: RwLock<Currency>,
    is_loading: AtomicBool,
}

impl CurrencyFacade {
    /// Create a facade. Selection starts at the pivot and `is_loading` is set
    /// until [`CurrencyFacade::initialize`] finishes loading.
    pub fn new(
        catalog: CurrencyCatalog,
        feed: Arc<dyn RateFeed>,
        store: Arc<dyn KeyValueStore>,
        config: &FxConfig,
    ) -> Self {
        let pivot = catalog.pivot().clone();
        let cache = RateCache::new(
            pivot.code.clone(),
            feed,
            store.clone(),
            config.storage.keys.clone(),
        );

        Self {
            catalog,
            cache,
            store,
            keys: config.storage.keys.clone(),
            grouping: config.grouping,
            selected: RwLock::new(pivot),
            is_loading: AtomicBool::new(true),
        }
    }

    /// Build a facade with the HTTP feed and the configured store.
    pub fn from_config(config: &FxConfig) -> FxResult<Arc<Self>> {
        config.validate().map_err(FxError::Configuration)?;

        let feed = HttpRateFeed::new(&config.feed)?;
        let store: Arc<dyn KeyValueStore> = match &config.storage.path {
            Some(path) => Arc::new(FileStore::new(path)),
            None => Arc::new(MemoryStore::new()),
        };

        Ok(Arc::new(Self::new(
            CurrencyCatalog::default(),
            Arc::new(feed),
            store,
            config,
        )))
    }

    /// Load the persisted selection and rates, then start a background refresh.
    ///
    /// `is_loading` clears once loading is done; the refresh does not hold
    /// it. The returned handle may be dropped, which leaves the refresh
    /// running detached; its outcome is only logged.
    #[instrument(skip(self))]
    pub async fn initialize(self: &Arc<Self>) -> JoinHandle<()> {
        self.load().await;

        let facade = Arc::clone(self);
        tokio::spawn(async move {
            match facade.cache.refresh().await {
                Ok(snapshot) => debug!(
                    entries = snapshot.table.len(),
                    "Startup rate refresh completed"
                ),
                Err(e) => warn!(error = %e, "Startup rate refresh failed, using cached rates"),
            }
        })
    }

    /// Load the persisted selection and rates without contacting the feed.
    pub async fn load(&self) {
        self.is_loading.store(true, Ordering::SeqCst);

        self.load_selection().await;
        self.cache.load().await;

        self.is_loading.store(false, Ordering::SeqCst);
        info!(selected = %self.selected_currency().code, "Currency state loaded");
    }

    async fn load_selection(&self) {
        let code = match self.store.get(&self.keys.selected_currency).await {
            Ok(Some(code)) => code,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Failed to read saved currency, keeping default");
                return;
            }
        };

        match self.catalog.find(&code) {
            Some(currency) => *self.selected.write() = currency.clone(),
            None => warn!(code = %code, "Saved currency is not in the catalog, ignoring"),
        }
    }

    /// Supported currencies, pivot first.
    pub fn list_currencies(&self) -> &[Currency] {
        self.catalog.list()
    }

    /// The catalog backing this facade.
    pub fn catalog(&self) -> &CurrencyCatalog {
        &self.catalog
    }

    /// The currency amounts are displayed in.
    pub fn selected_currency(&self) -> Currency {
        self.selected.read().clone()
    }

    /// Change the display currency and persist the choice.
    ///
    /// Unknown codes are ignored and yield `Ok(None)`. The in-memory
    /// selection changes even when persisting it fails; the failure is
    /// returned.
    #[instrument(skip(self))]
    pub async fn select_currency(&self, code: &str) -> FxResult<Option<Currency>> {
        let Some(currency) = self.catalog.find(code).cloned() else {
            debug!("Ignoring selection of unlisted currency");
            return Ok(None);
        };

        *self.selected.write() = currency.clone();

        self.store
            .set(&self.keys.selected_currency, currency.code())
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to persist selected currency");
                e
            })?;

        info!(code = %currency.code, name = %currency.name, "Currency changed");
        Ok(Some(currency))
    }

    /// Fetch fresh rates. Cached rates survive a failure.
    pub async fn refresh_rates(&self) -> FxResult<Arc<RateSnapshot>> {
        self.cache.refresh().await
    }

    /// Convert `amount` of `from` (default: pivot) into the selected currency.
    pub fn convert_amount(&self, amount: f64, from: Option<&str>) -> f64 {
        let target = self.selected.read().code.clone();
        self.convert_into(amount, from, target.as_str())
    }

    /// Convert then format `amount` in the selected currency.
    pub fn format_amount(&self, amount: f64, from: Option<&str>) -> String {
        let target = self.selected_currency();
        let converted = self.convert_into(amount, from, target.code());
        conversion::format(converted, &target, self.grouping)
    }

    fn convert_into(&self, amount: f64, from: Option<&str>, to: &str) -> f64 {
        let snapshot = self.cache.current();
        let from = from.unwrap_or_else(|| self.catalog.pivot().code());
        conversion::convert(amount, from, &snapshot, to)
    }

    /// When the current rates were fetched, if ever.
    pub fn rates_last_updated(&self) -> Option<DateTime<Utc>> {
        self.cache.current().fetched_at
    }

    /// True from construction until the initial load completes.
    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    /// The current rate snapshot.
    pub fn snapshot(&self) -> Arc<RateSnapshot> {
        self.cache.current()
    }

    /// Digit grouping used by [`CurrencyFacade::format_amount`].
    pub fn grouping(&self) -> Grouping {
        self.grouping
    }

    /// Rate cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::MockRateFeed;
    use crate::store::FlakyStore;

    fn setup() -> (Arc<MockRateFeed>, Arc<FlakyStore>, Arc<CurrencyFacade>) {
        let feed = Arc::new(MockRateFeed::new("test"));
        let store = Arc::new(FlakyStore::new());
        let facade = Arc::new(CurrencyFacade::new(
            CurrencyCatalog::default(),
            feed.clone(),
            store.clone(),
            &FxConfig::default(),
        ));
        (feed, store, facade)
    }

    #[tokio::test]
    async fn test_defaults_before_initialize() {
        let (_, _, facade) = setup();

        assert!(facade.is_loading());
        assert_eq!(facade.selected_currency().code, "INR");
        assert_eq!(facade.rates_last_updated(), None);
        assert_eq!(facade.convert_amount(250.0, None), 250.0);
    }

    #[tokio::test]
    async fn test_initialize_clears_loading_and_refreshes() {
        let (feed, _, facade) = setup();
        feed.set_rates([("USD", 0.012)]);

        let refresh = facade.initialize().await;
        assert!(!facade.is_loading());

        refresh.await.unwrap();
        assert!(facade.rates_last_updated().is_some());
        assert_eq!(feed.calls(), 1);
    }

    #[tokio::test]
    async fn test_load_restores_state_without_fetching() {
        let (feed, store, facade) = setup();
        store.seed("@finmate_currency", "GBP");
        store.seed("@finmate_exchange_rates", r#"{"INR":1.0,"GBP":0.0095}"#);
        store.seed("@finmate_rates_updated", "2024-03-01T10:15:30.000Z");

        facade.load().await;

        assert!(!facade.is_loading());
        assert_eq!(facade.selected_currency().code, "GBP");
        assert_eq!(facade.format_amount(1000.0, None), "£9.50");
        assert!(facade.rates_last_updated().is_some());
        assert_eq!(feed.calls(), 0);
    }

    #[tokio::test]
    async fn test_initialize_does_not_wait_for_refresh() {
        let (feed, _, facade) = setup();
        feed.set_rates([("USD", 0.012)]);
        feed.hold();

        let refresh = facade.initialize().await;
        assert!(!facade.is_loading());
        assert_eq!(facade.rates_last_updated(), None);

        feed.release();
        refresh.await.unwrap();
        assert!(facade.rates_last_updated().is_some());
        assert!(!facade.is_loading());
    }

    #[tokio::test]
    async fn test_initialize_survives_refresh_failure() {
        let (feed, store, facade) = setup();
        store.seed("@finmate_exchange_rates", r#"{"INR":1,"USD":0.012}"#);
        feed.set_error(crate::FetchError::Transport("offline".into()));

        facade.initialize().await.await.unwrap();

        assert_eq!(facade.snapshot().table.get("USD"), Some(0.012));
    }

    #[tokio::test]
    async fn test_select_unknown_code_is_noop() {
        let (_, store, facade) = setup();

        let result = facade.select_currency("ZZZ").await.unwrap();

        assert_eq!(result, None);
        assert_eq!(facade.selected_currency().code, "INR");
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_select_currency_persists_code() {
        let (_, store, facade) = setup();

        let selected = facade.select_currency("usd").await.unwrap().unwrap();

        assert_eq!(selected.symbol, "$");
        assert_eq!(facade.selected_currency(), selected);
        assert_eq!(store.peek("@finmate_currency"), Some("USD".to_string()));
    }

    #[tokio::test]
    async fn test_select_currency_reports_persist_failure() {
        let (_, store, facade) = setup();
        store.fail_writes(true);

        let result = facade.select_currency("EUR").await;

        assert!(matches!(result, Err(FxError::Persistence(_))));
        assert_eq!(facade.selected_currency().code, "EUR");
    }

    #[tokio::test]
    async fn test_convert_and_format_use_selection() {
        let (feed, _, facade) = setup();
        feed.set_rates([("USD", 0.012)]);
        facade.refresh_rates().await.unwrap();
        facade.select_currency("USD").await.unwrap();

        assert!((facade.convert_amount(1000.0, None) - 12.0).abs() < 1e-9);
        assert_eq!(facade.convert_amount(5.0, Some("USD")), 5.0);
        assert_eq!(facade.format_amount(-102_875.0, None), "-$1,234.50");
    }

    #[tokio::test]
    async fn test_format_in_pivot_uses_lakh_grouping() {
        let (_, _, facade) = setup();

        assert_eq!(facade.format_amount(1_234_567.0, None), "₹12,34,567.00");
        assert_eq!(facade.format_amount(0.0, None), "₹0.00");
    }

    #[tokio::test]
    async fn test_refresh_failure_is_returned() {
        let (feed, _, facade) = setup();
        feed.set_error(crate::FetchError::Status { status: 500 });

        let err = facade.refresh_rates().await.unwrap_err();

        assert_eq!(err.error_code(), "FETCH_FAILURE");
        assert!(facade.snapshot().table.is_pivot_only());
    }
}
