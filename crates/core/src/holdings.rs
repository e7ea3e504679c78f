//! Precious-metal holdings and portfolio valuation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult, Metal, ReconciledPrice};

/// A purchase being recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingDraft {
    pub metal: Metal,
    pub quantity_oz: f64,
    /// Cents per troy ounce
    pub purchase_price_per_oz: i64,
    pub purchase_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl HoldingDraft {
    pub fn validate(&self) -> CoreResult<()> {
        if !self.quantity_oz.is_finite() || self.quantity_oz <= 0.0 {
            return Err(CoreError::InvalidValue {
                field: "quantity_oz",
                reason: format!("must be positive, got {}", self.quantity_oz),
            });
        }
        if self.purchase_price_per_oz < 0 {
            return Err(CoreError::InvalidValue {
                field: "purchase_price_per_oz",
                reason: "must not be negative".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetalHolding {
    pub id: String,
    #[serde(flatten)]
    pub draft: HoldingDraft,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_price_per_oz: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl MetalHolding {
    pub fn new(id: impl Into<String>, draft: HoldingDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            draft,
            sold_date: None,
            sold_price_per_oz: None,
            created_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.sold_date.is_none()
    }

    /// Purchase cost in cents
    pub fn invested(&self) -> f64 {
        self.draft.quantity_oz * self.draft.purchase_price_per_oz as f64
    }
}

/// Partial update of a holding. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetalHoldingPatch {
    #[serde(default)]
    pub quantity_oz: Option<f64>,
    #[serde(default)]
    pub purchase_price_per_oz: Option<i64>,
    #[serde(default)]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub sold_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sold_price_per_oz: Option<i64>,
}

impl MetalHoldingPatch {
    pub fn sale(sold_price_per_oz: i64, sold_date: DateTime<Utc>) -> Self {
        Self {
            sold_date: Some(sold_date),
            sold_price_per_oz: Some(sold_price_per_oz),
            ..Default::default()
        }
    }

    pub fn apply(&self, target: &mut MetalHolding) -> CoreResult<()> {
        let mut draft = target.draft.clone();
        if let Some(quantity) = self.quantity_oz {
            draft.quantity_oz = quantity;
        }
        if let Some(price) = self.purchase_price_per_oz {
            draft.purchase_price_per_oz = price;
        }
        if let Some(date) = self.purchase_date {
            draft.purchase_date = date;
        }
        if let Some(note) = &self.note {
            draft.note = Some(note.clone());
        }
        draft.validate()?;

        if let Some(price) = self.sold_price_per_oz {
            if price < 0 {
                return Err(CoreError::InvalidValue {
                    field: "sold_price_per_oz",
                    reason: "must not be negative".to_string(),
                });
            }
            target.sold_price_per_oz = Some(price);
        }
        if let Some(date) = self.sold_date {
            target.sold_date = Some(date);
        }
        target.draft = draft;
        Ok(())
    }
}

/// Valuation of active holdings at the reconciled prices. Money in cents.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PortfolioStats {
    pub total_invested: f64,
    pub total_current_value: f64,
    pub gain_loss: f64,
    pub gain_loss_percent: f64,
    pub gold_oz: f64,
    pub silver_oz: f64,
    pub gold_price: i64,
    pub silver_price: i64,
}

impl PortfolioStats {
    pub fn compute<'a>(
        holdings: impl IntoIterator<Item = &'a MetalHolding>,
        prices: &ReconciledPrice,
    ) -> Self {
        let mut stats = PortfolioStats {
            gold_price: prices.gold_cents,
            silver_price: prices.silver_cents,
            ..Default::default()
        };

        for holding in holdings.into_iter().filter(|h| h.is_active()) {
            let quantity = holding.draft.quantity_oz;
            stats.total_invested += holding.invested();
            stats.total_current_value += quantity * prices.cents(holding.draft.metal) as f64;

            match holding.draft.metal {
                Metal::Gold => stats.gold_oz += quantity,
                Metal::Silver => stats.silver_oz += quantity,
            }
        }

        stats.gain_loss = stats.total_current_value - stats.total_invested;
        stats.gain_loss_percent = if stats.total_invested > 0.0 {
            stats.gain_loss / stats.total_invested * 100.0
        } else {
            0.0
        };
        stats
    }
}

/// A holding valued at the reconciled price of its metal. Money in cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingValuation {
    #[serde(flatten)]
    pub holding: MetalHolding,
    pub current_price: i64,
    pub invested: f64,
    pub current_value: f64,
    pub gain_loss: f64,
    pub gain_loss_percent: f64,
}

impl HoldingValuation {
    pub fn compute(holding: &MetalHolding, prices: &ReconciledPrice) -> Self {
        let current_price = prices.cents(holding.draft.metal);
        let invested = holding.invested();
        let current_value = holding.draft.quantity_oz * current_price as f64;
        let gain_loss = current_value - invested;

        Self {
            holding: holding.clone(),
            current_price,
            invested,
            current_value,
            gain_loss,
            gain_loss_percent: if invested > 0.0 {
                gain_loss / invested * 100.0
            } else {
                0.0
            },
        }
    }
}
