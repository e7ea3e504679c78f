//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::{CoreError, CoreResult};

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Built-in spot price feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    MetalsLive,
    GoldApi,
    GoldpriceOrg,
}

impl SourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::MetalsLive => "metals.live",
            SourceKind::GoldApi => "gold-api.com",
            SourceKind::GoldpriceOrg => "goldprice.org",
        }
    }

    pub fn default_url(&self) -> &'static str {
        match self {
            SourceKind::MetalsLive => "https://api.metals.live/v1/spot",
            SourceKind::GoldApi => "https://api.gold-api.com/price",
            SourceKind::GoldpriceOrg => "https://data-asg.goldprice.org/dbXRates/USD",
        }
    }
}

/// One configured price feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl SourceConfig {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            url: None,
            name: None,
        }
    }

    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or_else(|| self.kind.default_url())
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.kind.name())
    }
}

/// Price reconciliation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceSettings {
    pub interval_secs: u64,
    pub request_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    /// JSON settings file; in-memory store when unset
    pub store_path: Option<PathBuf>,
    pub sources: Vec<SourceConfig>,
}

impl Default for PriceSettings {
    fn default() -> Self {
        Self {
            interval_secs: 15 * 60,
            request_timeout_secs: 10,
            cache_ttl_secs: 60,
            store_path: None,
            sources: vec![
                SourceConfig::new(SourceKind::MetalsLive),
                SourceConfig::new(SourceKind::GoldApi),
                SourceConfig::new(SourceKind::GoldpriceOrg),
            ],
        }
    }
}

impl PriceSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeboardConfig {
    pub server: ServerSettings,
    pub prices: PriceSettings,
}

impl HomeboardConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.server.port == 0 {
            return Err(CoreError::InvalidConfig("server.port must be nonzero".into()));
        }
        if self.prices.interval_secs == 0 {
            return Err(CoreError::InvalidConfig(
                "prices.interval_secs must be positive".into(),
            ));
        }
        if self.prices.request_timeout_secs == 0 {
            return Err(CoreError::InvalidConfig(
                "prices.request_timeout_secs must be positive".into(),
            ));
        }
        if self.prices.sources.is_empty() {
            return Err(CoreError::InvalidConfig(
                "at least one price source must be configured".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = HomeboardConfig::default();
        config.validate().unwrap();
        assert_eq!(config.prices.interval(), Duration::from_secs(900));
        assert_eq!(config.prices.sources.len(), 3);
        assert_eq!(config.server.address(), "127.0.0.1:8787");
    }

    #[test]
    fn test_source_overrides() {
        let json = r#"{"kind": "gold_api", "url": "http://localhost:9000/price"}"#;
        let source: SourceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(source.kind, SourceKind::GoldApi);
        assert_eq!(source.url(), "http://localhost:9000/price");
        assert_eq!(source.name(), "gold-api.com");
    }

    #[test]
    fn test_rejects_empty_sources() {
        let mut config = HomeboardConfig::default();
        config.prices.sources.clear();
        assert!(config.validate().is_err());
    }
}
