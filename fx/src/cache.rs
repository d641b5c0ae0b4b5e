//! Exchange rate cache with persisted fallback.
//!
//! The cache owns the live [`RateSnapshot`]. Readers get the last committed
//! snapshot without waiting on refreshes. Refreshes run one at a time; a
//! failed refresh leaves both memory and storage untouched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use finmate_common::{is_valid_rate, CurrencyCode, ExchangeRateTable, FetchTimestamp, RateSnapshot};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::StorageKeys;
use crate::error::{FetchError, FxResult};
use crate::feed::{FeedResponse, RateFeed};
use crate::store::KeyValueStore;

/// Thread-safe rate cache backed by a feed and a store.
pub struct RateCache {
    pivot: CurrencyCode,
    feed: Arc<dyn RateFeed>,
    store: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
    snapshot: RwLock<Arc<RateSnapshot>>,
    refresh_lock: Mutex<()>,
    refreshes_succeeded: AtomicU64,
    refreshes_failed: AtomicU64,
}

impl RateCache {
    /// Create a cache holding only the pivot rate.
    pub fn new(
        pivot: CurrencyCode,
        feed: Arc<dyn RateFeed>,
        store: Arc<dyn KeyValueStore>,
        keys: StorageKeys,
    ) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(RateSnapshot::empty(pivot.clone()))),
            pivot,
            feed,
            store,
            keys,
            refresh_lock: Mutex::new(()),
            refreshes_succeeded: AtomicU64::new(0),
            refreshes_failed: AtomicU64::new(0),
        }
    }

    /// The pivot code all rates are relative to.
    pub fn pivot(&self) -> &CurrencyCode {
        &self.pivot
    }

    /// The live snapshot. Never waits on a refresh.
    pub fn current(&self) -> Arc<RateSnapshot> {
        self.snapshot.read().clone()
    }

    /// Load the persisted table and timestamp into memory.
    ///
    /// Never fails: unreadable or missing data yields the pivot-only
    /// snapshot. A snapshot already produced by a refresh is kept.
    #[instrument(skip(self), fields(pivot = %self.pivot))]
    pub async fn load(&self) -> Arc<RateSnapshot> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.current();
        if current.has_fetched() {
            debug!("Keeping refreshed snapshot over persisted one");
            return current;
        }

        let loaded = Arc::new(self.read_persisted().await);
        *self.snapshot.write() = loaded.clone();

        info!(
            entries = loaded.table.len(),
            fetched_at = ?loaded.fetched_at,
            "Loaded cached rates"
        );
        loaded
    }

    /// Fetch fresh rates and commit them.
    ///
    /// On fetch or validation failure nothing changes. On success the new
    /// snapshot is swapped in and then persisted; a persistence failure is
    /// returned but the in-memory snapshot stays refreshed.
    #[instrument(skip(self), fields(pivot = %self.pivot, feed = self.feed.name()))]
    pub async fn refresh(&self) -> FxResult<Arc<RateSnapshot>> {
        let _guard = self.refresh_lock.lock().await;

        let table = match self.fetch_table().await {
            Ok(table) => table,
            Err(e) => {
                self.refreshes_failed.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Rate refresh failed, keeping cached rates");
                return Err(e.into());
            }
        };

        let snapshot = Arc::new(RateSnapshot::new(table, Some(Utc::now())));
        *self.snapshot.write() = snapshot.clone();
        self.refreshes_succeeded.fetch_add(1, Ordering::Relaxed);

        info!(entries = snapshot.table.len(), "Exchange rates updated");

        self.persist(&snapshot).await?;
        Ok(snapshot)
    }

    /// Refresh counters.
    pub fn stats(&self) -> CacheStats {
        let snapshot = self.current();
        CacheStats {
            entries: snapshot.table.len(),
            fetched_at: snapshot.fetched_at,
            refreshes_succeeded: self.refreshes_succeeded.load(Ordering::Relaxed),
            refreshes_failed: self.refreshes_failed.load(Ordering::Relaxed),
        }
    }

    async fn fetch_table(&self) -> Result<ExchangeRateTable, FetchError> {
        let response = self.feed.fetch_rates(&self.pivot).await?;
        validate_response(&self.pivot, response)
    }

    async fn persist(&self, snapshot: &RateSnapshot) -> FxResult<()> {
        let json = snapshot
            .table
            .to_json()
            .map_err(crate::error::StoreError::from)?;
        self.store.set(&self.keys.rates, &json).await.map_err(|e| {
            warn!(error = %e, "Failed to persist rate table");
            e
        })?;

        if let Some(at) = snapshot.fetched_at {
            let stamp = FetchTimestamp(at).to_rfc3339();
            self.store
                .set(&self.keys.rates_updated, &stamp)
                .await
                .map_err(|e| {
                    warn!(error = %e, "Failed to persist rate timestamp");
                    e
                })?;
        }
        Ok(())
    }

    async fn read_persisted(&self) -> RateSnapshot {
        let json = match self.store.get(&self.keys.rates).await {
            Ok(Some(json)) => json,
            Ok(None) => {
                debug!("No persisted rate table");
                return RateSnapshot::empty(self.pivot.clone());
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted rates, using defaults");
                return RateSnapshot::empty(self.pivot.clone());
            }
        };

        let table = match ExchangeRateTable::from_json(self.pivot.clone(), &json) {
            Ok(table) => table,
            Err(e) => {
                warn!(error = %e, "Persisted rate table is malformed, using defaults");
                return RateSnapshot::empty(self.pivot.clone());
            }
        };

        let fetched_at = match self.store.get(&self.keys.rates_updated).await {
            Ok(Some(raw)) => match FetchTimestamp::parse(&raw) {
                Ok(ts) => Some(ts.0),
                Err(e) => {
                    warn!(error = %e, value = %raw, "Persisted rate timestamp is malformed");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted rate timestamp");
                None
            }
        };

        RateSnapshot::new(table, fetched_at)
    }
}

/// Check a feed response and turn it into a table.
///
/// Unusable entries are dropped, the pivot is pinned to `1.0`, and a
/// response with nothing left besides the pivot is rejected.
pub fn validate_response(
    pivot: &CurrencyCode,
    response: FeedResponse,
) -> Result<ExchangeRateTable, FetchError> {
    if let Some(base) = response.base.as_deref() {
        if CurrencyCode::new(base) != *pivot {
            return Err(FetchError::BaseMismatch {
                expected: pivot.to_string(),
                actual: base.to_string(),
            });
        }
    }

    let mut usable = Vec::with_capacity(response.rates.len());
    for (code, rate) in response.rates {
        let code = CurrencyCode::new(code);
        if code == *pivot {
            if rate != 1.0 {
                warn!(rate, "Feed quoted the pivot at a rate other than 1, pinning to 1");
            }
            continue;
        }
        if !is_valid_rate(rate) {
            warn!(code = %code, rate, "Dropping unusable rate");
            continue;
        }
        usable.push((code, rate));
    }

    if usable.is_empty() {
        return Err(FetchError::EmptyRates);
    }

    Ok(ExchangeRateTable::new(pivot.clone(), usable))
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: usize,
    pub fetched_at: Option<chrono::DateTime<Utc>>,
    pub refreshes_succeeded: u64,
    pub refreshes_failed: u64,
}
