//! Reconciliation cycle: fetch every source, combine, persist

use futures::future::join_all;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

use homeboard_core::{
    now, to_cents, CoreError, Metal, PriceReading, ReconciledPrice, StoreError, StoreResult,
};

use crate::sources::{fetch_from_source, PriceSource};
use crate::store::{get_reconciled_price, put_reconciled_price, SettingsStore};

/// Usable values from this many sources switch the combination from mean to median
pub const MEDIAN_THRESHOLD: usize = 3;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("All {0} price sources failed")]
    AllSourcesFailed(usize),

    #[error("No usable {0} price in any reading")]
    NoUsablePrice(Metal),

    #[error("Price conversion failed: {0}")]
    Conversion(#[from] CoreError),

    #[error("Failed to persist prices: {0}")]
    Store(#[from] StoreError),
}

/// Combine one metal's prices from several sources.
///
/// Non-positive values are dropped first. One or two survivors are
/// averaged; three or more use the median, so a single bad feed cannot
/// drag the result. Returns `None` when nothing survives.
pub fn combine(values: &[Decimal]) -> Option<Decimal> {
    let mut usable: Vec<Decimal> = values
        .iter()
        .copied()
        .filter(|v| *v > Decimal::ZERO)
        .collect();

    match usable.len() {
        0 => None,
        n if n < MEDIAN_THRESHOLD => mean(&usable),
        n => {
            usable.sort();
            let mid = n / 2;
            if n % 2 == 1 {
                Some(usable[mid])
            } else {
                mean(&usable[mid - 1..=mid])
            }
        }
    }
}

/// Arithmetic mean that cannot overflow: each term is divided before summing
fn mean(values: &[Decimal]) -> Option<Decimal> {
    let n = Decimal::from(values.len());
    values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v.checked_div(n)?))
}

/// Combine a cycle's readings into cents for both metals
pub fn combine_readings(
    readings: &[PriceReading],
) -> Result<(i64, i64), ReconcileError> {
    if readings.is_empty() {
        return Err(ReconcileError::AllSourcesFailed(0));
    }

    let combined = |metal: Metal| -> Result<i64, ReconcileError> {
        let values: Vec<Decimal> = readings.iter().map(|r| r.price(metal)).collect();
        let price = combine(&values).ok_or(ReconcileError::NoUsablePrice(metal))?;
        Ok(to_cents(price)?)
    };

    Ok((combined(Metal::Gold)?, combined(Metal::Silver)?))
}

/// Runs reconciliation cycles against a fixed set of sources and a store
pub struct PriceReconciler {
    sources: Vec<Arc<dyn PriceSource>>,
    store: Arc<dyn SettingsStore>,
    cycle: Mutex<()>,
    published: watch::Sender<Option<ReconciledPrice>>,
}

impl PriceReconciler {
    pub fn new(sources: Vec<Arc<dyn PriceSource>>, store: Arc<dyn SettingsStore>) -> Self {
        Self {
            sources,
            store,
            cycle: Mutex::new(()),
            published: watch::channel(None).0,
        }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn store(&self) -> Arc<dyn SettingsStore> {
        Arc::clone(&self.store)
    }

    /// Receives every successfully persisted price, whichever trigger ran the cycle
    pub fn subscribe(&self) -> watch::Receiver<Option<ReconciledPrice>> {
        self.published.subscribe()
    }

    /// Query every source concurrently and wait for all of them to settle
    pub async fn fetch_all(&self) -> Vec<PriceReading> {
        join_all(self.sources.iter().map(|s| fetch_from_source(s.as_ref())))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Run one full cycle.
    ///
    /// Nothing is written unless both metals produced a price; the previous
    /// record stays authoritative on failure. Cycles never overlap.
    pub async fn reconcile(&self) -> Result<ReconciledPrice, ReconcileError> {
        let _cycle = self.cycle.lock().await;

        let readings = self.fetch_all().await;
        if readings.is_empty() {
            error!(
                "All {} price sources failed, keeping previous prices",
                self.sources.len()
            );
            return Err(ReconcileError::AllSourcesFailed(self.sources.len()));
        }

        if readings.len() < self.sources.len() {
            warn!(
                "Only {}/{} price sources responded",
                readings.len(),
                self.sources.len()
            );
        }

        let (gold_cents, silver_cents) = match combine_readings(&readings) {
            Ok(cents) => cents,
            Err(e) => {
                error!("Price reconciliation failed: {}", e);
                return Err(e);
            }
        };

        let price = ReconciledPrice {
            gold_cents,
            silver_cents,
            updated_at: Some(now()),
        };

        if let Err(e) = put_reconciled_price(self.store.as_ref(), &price).await {
            error!("Failed to persist reconciled prices: {}", e);
            return Err(e.into());
        }

        info!(
            "Metal prices updated from {} sources: gold ${}.{:02}, silver ${}.{:02}",
            readings.len(),
            gold_cents / 100,
            gold_cents % 100,
            silver_cents / 100,
            silver_cents % 100
        );

        self.published.send_replace(Some(price));
        Ok(price)
    }

    /// Last persisted prices, zeros on cold start
    pub async fn current_price(&self) -> StoreResult<ReconciledPrice> {
        get_reconciled_price(self.store.as_ref()).await
    }
}
