//! Shared service state behind the HTTP handlers

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use homeboard_core::{HomeboardConfig, ReconciledPrice, StoreResult, TtlCache};
use homeboard_price_feed::{
    HttpPriceSource, JsonFileSettingsStore, MemorySettingsStore, PriceReconciler, PriceSource,
    ReconcileError, SettingsStore,
};

use crate::holdings::HoldingsStore;
use crate::shopping::ShoppingListStore;

const PRICES_CACHE_KEY: &str = "metal_prices";

/// Everything a request handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct HomeboardService {
    reconciler: Arc<PriceReconciler>,
    price_cache: Arc<TtlCache<&'static str, ReconciledPrice>>,
    price_updates: Arc<Mutex<watch::Receiver<Option<ReconciledPrice>>>>,
    shopping: Arc<ShoppingListStore>,
    holdings: Arc<HoldingsStore>,
    start_time: Instant,
}

impl HomeboardService {
    pub fn new(reconciler: Arc<PriceReconciler>, cache_ttl: Duration) -> Self {
        let price_updates = Arc::new(Mutex::new(reconciler.subscribe()));
        Self {
            reconciler,
            price_cache: Arc::new(TtlCache::new(cache_ttl)),
            price_updates,
            shopping: Arc::new(ShoppingListStore::new()),
            holdings: Arc::new(HoldingsStore::new()),
            start_time: Instant::now(),
        }
    }

    /// Wire sources and the settings store from configuration
    pub async fn from_config(config: &HomeboardConfig) -> anyhow::Result<Self> {
        let prices = &config.prices;

        let mut sources: Vec<Arc<dyn PriceSource>> = Vec::with_capacity(prices.sources.len());
        for source in &prices.sources {
            debug!("Configuring price source {} at {}", source.name(), source.url());
            sources.push(Arc::new(HttpPriceSource::new(
                source.clone(),
                prices.request_timeout(),
            )?));
        }

        let store: Arc<dyn SettingsStore> = match &prices.store_path {
            Some(path) => {
                info!("Persisting settings to {}", path.display());
                Arc::new(JsonFileSettingsStore::open(path).await?)
            }
            None => {
                warn!("No store_path configured, prices are kept in memory only");
                Arc::new(MemorySettingsStore::new())
            }
        };

        let reconciler = Arc::new(PriceReconciler::new(sources, store));
        Ok(Self::new(reconciler, prices.cache_ttl()))
    }

    pub fn reconciler(&self) -> Arc<PriceReconciler> {
        Arc::clone(&self.reconciler)
    }

    pub fn shopping(&self) -> &ShoppingListStore {
        &self.shopping
    }

    pub fn holdings(&self) -> &HoldingsStore {
        &self.holdings
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Last reconciled prices, served from cache while fresh.
    ///
    /// A cycle that succeeded since the last read replaces the cached copy,
    /// whether it came from the scheduler or from `refresh_prices`.
    pub async fn current_prices(&self) -> StoreResult<ReconciledPrice> {
        self.take_published();

        if let Some(cached) = self.price_cache.get(&PRICES_CACHE_KEY) {
            return Ok(cached);
        }

        let price = self.reconciler.current_price().await?;
        self.price_cache.insert(PRICES_CACHE_KEY, price);
        Ok(price)
    }

    /// Run a reconciliation cycle now
    pub async fn refresh_prices(&self) -> Result<ReconciledPrice, ReconcileError> {
        let price = self.reconciler.reconcile().await?;
        self.take_published();
        Ok(price)
    }

    fn take_published(&self) {
        let mut updates = self.price_updates.lock();
        if !updates.has_changed().unwrap_or(false) {
            return;
        }

        let published = *updates.borrow_and_update();
        match published {
            Some(price) => self.price_cache.insert(PRICES_CACHE_KEY, price),
            None => {
                self.price_cache.invalidate(&PRICES_CACHE_KEY);
            }
        }
    }
}
