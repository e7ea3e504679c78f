//! Precious-metal price reconciliation
//!
//! Features:
//! - Concurrent fan-out to independent spot price feeds
//! - Per-source failure isolation
//! - Mean/median combination with a non-positive price filter
//! - Upserted cent prices in a key-value settings store
//! - Fixed-interval scheduling

pub mod reconcile;
pub mod scheduler;
pub mod sources;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use reconcile::{combine, PriceReconciler, ReconcileError, MEDIAN_THRESHOLD};
pub use scheduler::{ReconcileScheduler, SchedulerConfig, SchedulerStats};
pub use sources::{fetch_from_source, HttpPriceSource, PriceSource};
pub use store::{
    get_reconciled_price, put_reconciled_price, JsonFileSettingsStore, MemorySettingsStore,
    SettingsStore,
};
