//! Core type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// Tracked precious metals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metal {
    Gold,
    Silver,
}

impl Metal {
    pub const ALL: [Metal; 2] = [Metal::Gold, Metal::Silver];

    pub fn name(&self) -> &'static str {
        match self {
            Metal::Gold => "gold",
            Metal::Silver => "silver",
        }
    }

    /// ISO 4217 code used by spot price feeds
    pub fn iso_code(&self) -> &'static str {
        match self {
            Metal::Gold => "XAU",
            Metal::Silver => "XAG",
        }
    }

    /// Settings key the reconciled price is persisted under
    pub fn settings_key(&self) -> &'static str {
        match self {
            Metal::Gold => "gold_price",
            Metal::Silver => "silver_price",
        }
    }
}

impl fmt::Display for Metal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Metal {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gold" | "xau" => Ok(Metal::Gold),
            "silver" | "xag" => Ok(Metal::Silver),
            other => Err(CoreError::InvalidValue {
                field: "metal",
                reason: format!("unknown metal '{other}'"),
            }),
        }
    }
}

/// Current wall-clock time
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time in unix milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
