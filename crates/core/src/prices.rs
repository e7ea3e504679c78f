//! Price readings, reconciled prices and cent conversion

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{CoreError, CoreResult, Metal};

/// Settings key holding the time of the last successful reconciliation
pub const PRICES_UPDATED_AT_KEY: &str = "prices_updated_at";

/// One source's report for a single cycle, in USD per troy ounce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceReading {
    pub gold: Decimal,
    pub silver: Decimal,
    pub source: String,
}

impl PriceReading {
    pub fn new(source: impl Into<String>, gold: Decimal, silver: Decimal) -> Self {
        Self {
            gold,
            silver,
            source: source.into(),
        }
    }

    pub fn price(&self, metal: Metal) -> Decimal {
        match metal {
            Metal::Gold => self.gold,
            Metal::Silver => self.silver,
        }
    }
}

/// Trusted price pair in cents, as persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledPrice {
    #[serde(rename = "gold")]
    pub gold_cents: i64,
    #[serde(rename = "silver")]
    pub silver_cents: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ReconciledPrice {
    /// Cold-start value: nothing has been persisted yet
    pub fn zero() -> Self {
        Self {
            gold_cents: 0,
            silver_cents: 0,
            updated_at: None,
        }
    }

    pub fn cents(&self, metal: Metal) -> i64 {
        match metal {
            Metal::Gold => self.gold_cents,
            Metal::Silver => self.silver_cents,
        }
    }

    pub fn is_cold(&self) -> bool {
        self.updated_at.is_none() && self.gold_cents == 0 && self.silver_cents == 0
    }
}

impl Default for ReconciledPrice {
    fn default() -> Self {
        Self::zero()
    }
}

/// Convert a dollar price to integer cents, rounding half away from zero
pub fn to_cents(price: Decimal) -> CoreResult<i64> {
    price
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|cents| cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|cents| cents.to_i64())
        .ok_or_else(|| CoreError::PriceOutOfRange(price.to_string()))
}

/// Parse a persisted base-10 cents string
pub fn parse_cents(value: &str) -> CoreResult<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|e| CoreError::InvalidValue {
            field: "cents",
            reason: format!("'{value}': {e}"),
        })
}

/// Read a JSON number (or numeric string) as an exact decimal.
///
/// Goes through the shortest textual form of the number so that `30.005`
/// stays `30.005` instead of the nearest binary float.
pub fn decimal_from_json(value: &serde_json::Value) -> Option<Decimal> {
    let text = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        _ => return None,
    };

    if text.contains(['e', 'E']) {
        Decimal::from_scientific(&text).ok()
    } else {
        Decimal::from_str(&text).ok()
    }
}
