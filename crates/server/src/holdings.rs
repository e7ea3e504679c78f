//! In-memory precious-metal holdings store

use chrono::Utc;
use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use homeboard_core::{
    CoreError, CoreResult, HoldingDraft, HoldingValuation, Metal, MetalHolding,
    MetalHoldingPatch, PortfolioStats, ReconciledPrice,
};

#[derive(Debug, Default)]
pub struct HoldingsStore {
    holdings: DashMap<String, MetalHolding>,
}

impl HoldingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All holdings, newest purchase first
    pub fn list(&self) -> Vec<MetalHolding> {
        let mut holdings: Vec<MetalHolding> =
            self.holdings.iter().map(|e| e.value().clone()).collect();
        holdings.sort_by(|a, b| {
            b.draft
                .purchase_date
                .cmp(&a.draft.purchase_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        holdings
    }

    pub fn list_active(&self) -> Vec<MetalHolding> {
        self.list().into_iter().filter(|h| h.is_active()).collect()
    }

    /// Holdings of one metal, newest purchase first
    pub fn list_by_metal(&self, metal: Metal) -> Vec<MetalHolding> {
        self.list()
            .into_iter()
            .filter(|h| h.draft.metal == metal)
            .collect()
    }

    /// Active holdings valued at `prices`, newest purchase first
    pub fn valued(&self, prices: &ReconciledPrice) -> Vec<HoldingValuation> {
        self.list_active()
            .iter()
            .map(|h| HoldingValuation::compute(h, prices))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<MetalHolding> {
        self.holdings.get(id).map(|e| e.value().clone())
    }

    pub fn add(&self, draft: HoldingDraft) -> CoreResult<MetalHolding> {
        draft.validate()?;
        let holding = MetalHolding::new(Uuid::new_v4().to_string(), draft, Utc::now());
        info!(
            "Recorded {} oz {} purchase ({})",
            holding.draft.quantity_oz, holding.draft.metal, holding.id
        );
        self.holdings.insert(holding.id.clone(), holding.clone());
        Ok(holding)
    }

    pub fn update(&self, id: &str, patch: &MetalHoldingPatch) -> CoreResult<MetalHolding> {
        self.modify(id, |holding| patch.apply(holding))
    }

    /// Mark a holding as sold at `price_per_oz` cents
    pub fn sell(&self, id: &str, price_per_oz: i64) -> CoreResult<MetalHolding> {
        let sale = MetalHoldingPatch::sale(price_per_oz, Utc::now());
        self.modify(id, |holding| {
            if !holding.is_active() {
                return Err(CoreError::InvalidValue {
                    field: "sold_date",
                    reason: format!("holding {} is already sold", id),
                });
            }
            sale.apply(holding)
        })
    }

    /// Run `f` on a copy under the entry's write guard, storing it only on success
    fn modify<F>(&self, id: &str, f: F) -> CoreResult<MetalHolding>
    where
        F: FnOnce(&mut MetalHolding) -> CoreResult<()>,
    {
        let mut entry = self
            .holdings
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        let mut updated = entry.value().clone();
        f(&mut updated)?;
        *entry.value_mut() = updated.clone();
        Ok(updated)
    }

    pub fn remove(&self, id: &str) -> CoreResult<MetalHolding> {
        self.holdings
            .remove(id)
            .map(|(_, holding)| holding)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    pub fn portfolio_stats(&self, prices: &ReconciledPrice) -> PortfolioStats {
        let holdings: Vec<MetalHolding> =
            self.holdings.iter().map(|e| e.value().clone()).collect();
        PortfolioStats::compute(&holdings, prices)
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }
}
