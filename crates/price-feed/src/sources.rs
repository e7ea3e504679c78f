//! HTTP spot price feed implementations

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use homeboard_core::{
    decimal_from_json, Metal, PriceFeedError, PriceFeedResult, PriceReading, SourceConfig,
    SourceKind,
};

const USER_AGENT: &str = concat!("homeboard/", env!("CARGO_PKG_VERSION"));

/// One independently operated price feed
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch one gold/silver reading in USD per troy ounce
    async fn fetch(&self) -> PriceFeedResult<PriceReading>;
}

/// Fetch from a single source, isolating its failure.
///
/// Errors are logged and turned into `None` so one feed can never abort a
/// reconciliation cycle.
pub async fn fetch_from_source(source: &dyn PriceSource) -> Option<PriceReading> {
    match source.fetch().await {
        Ok(reading) => {
            debug!(
                "{} reported gold={} silver={}",
                source.name(),
                reading.gold,
                reading.silver
            );
            Some(reading)
        }
        Err(e) => {
            warn!("Price source {} failed: {}", source.name(), e);
            None
        }
    }
}

/// Price feed backed by one of the built-in HTTP APIs
pub struct HttpPriceSource {
    config: SourceConfig,
    client: Client,
}

impl HttpPriceSource {
    pub fn new(config: SourceConfig, timeout: Duration) -> PriceFeedResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PriceFeedError::RequestFailed(e.to_string()))?;

        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: SourceConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn kind(&self) -> SourceKind {
        self.config.kind
    }

    pub fn url(&self) -> &str {
        self.config.url()
    }

    async fn get_json(&self, url: &str) -> PriceFeedResult<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PriceFeedError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PriceFeedError::RateLimited);
        }
        if !status.is_success() {
            return Err(PriceFeedError::BadStatus {
                source_name: self.name().to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| PriceFeedError::InvalidResponse(e.to_string()))
    }

    async fn fetch_gold_api_metal(&self, metal: Metal) -> PriceFeedResult<Decimal> {
        let url = format!("{}/{}", self.url().trim_end_matches('/'), metal.iso_code());
        let body = self.get_json(&url).await?;
        parse_gold_api(self.name(), &body)
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    fn name(&self) -> &str {
        self.config.name()
    }

    async fn fetch(&self) -> PriceFeedResult<PriceReading> {
        match self.config.kind {
            SourceKind::MetalsLive => {
                let body = self.get_json(self.url()).await?;
                parse_metals_live(self.name(), &body)
            }
            SourceKind::GoldApi => {
                let (gold, silver) = futures::try_join!(
                    self.fetch_gold_api_metal(Metal::Gold),
                    self.fetch_gold_api_metal(Metal::Silver),
                )?;
                Ok(PriceReading::new(self.name(), gold, silver))
            }
            SourceKind::GoldpriceOrg => {
                let body = self.get_json(self.url()).await?;
                parse_goldprice_org(self.name(), &body)
            }
        }
    }
}

fn missing(source: &str, field: &'static str) -> PriceFeedError {
    PriceFeedError::MissingField {
        source_name: source.to_string(),
        field,
    }
}

/// metals.live: `[{"gold": 2600.1, "silver": 30.2, ...}]`.
///
/// Some deployments split metals across elements (`[{"gold": ..}, {"silver": ..}]`),
/// so the first element carrying each metal wins.
pub fn parse_metals_live(source: &str, body: &Value) -> PriceFeedResult<PriceReading> {
    let entries = body
        .as_array()
        .ok_or_else(|| PriceFeedError::InvalidResponse("expected a JSON array".into()))?;

    let find = |key: &'static str| {
        entries
            .iter()
            .find_map(|entry| entry.get(key).and_then(decimal_from_json))
            .ok_or_else(|| missing(source, key))
    };

    Ok(PriceReading::new(source, find("gold")?, find("silver")?))
}

/// gold-api.com: `{"name": "Gold", "price": 2600.1, "symbol": "XAU", ...}`
pub fn parse_gold_api(source: &str, body: &Value) -> PriceFeedResult<Decimal> {
    body.get("price")
        .and_then(decimal_from_json)
        .ok_or_else(|| missing(source, "price"))
}

/// goldprice.org: `{"items": [{"curr": "USD", "xauPrice": 2600.1, "xagPrice": 30.2}]}`
pub fn parse_goldprice_org(source: &str, body: &Value) -> PriceFeedResult<PriceReading> {
    let items = body
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| missing(source, "items"))?;

    let usd = items
        .iter()
        .find(|item| item.get("curr").and_then(Value::as_str) == Some("USD"))
        .or_else(|| items.first())
        .ok_or_else(|| missing(source, "items"))?;

    let gold = usd
        .get("xauPrice")
        .and_then(decimal_from_json)
        .ok_or_else(|| missing(source, "xauPrice"))?;
    let silver = usd
        .get("xagPrice")
        .and_then(decimal_from_json)
        .ok_or_else(|| missing(source, "xagPrice"))?;

    Ok(PriceReading::new(source, gold, silver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode as HttpStatus;
    use axum::routing::get;
    use axum::{Json, Router};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::net::SocketAddr;

    use crate::test_support::ScriptedSource;

    #[test]
    fn test_parse_metals_live() {
        let body = json!([{"gold": 2601.23, "silver": 30.005, "platinum": 950.1}]);
        let reading = parse_metals_live("metals.live", &body).unwrap();
        assert_eq!(reading.gold, dec!(2601.23));
        assert_eq!(reading.silver, dec!(30.005));
        assert_eq!(reading.source, "metals.live");
    }

    #[test]
    fn test_parse_metals_live_split_entries() {
        let body = json!([{"gold": 2600}, {"silver": "30.10"}]);
        let reading = parse_metals_live("metals.live", &body).unwrap();
        assert_eq!(reading.gold, dec!(2600));
        assert_eq!(reading.silver, dec!(30.10));
    }

    #[test]
    fn test_parse_metals_live_rejects_bad_shapes() {
        assert!(matches!(
            parse_metals_live("m", &json!({"gold": 1})),
            Err(PriceFeedError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_metals_live("m", &json!([])),
            Err(PriceFeedError::MissingField { field: "gold", .. })
        ));
        assert!(matches!(
            parse_metals_live("m", &json!([{"gold": 2600}])),
            Err(PriceFeedError::MissingField { field: "silver", .. })
        ));
    }

    #[test]
    fn test_parse_gold_api() {
        let body = json!({"name": "Gold", "price": 2599.75, "symbol": "XAU"});
        assert_eq!(parse_gold_api("g", &body).unwrap(), dec!(2599.75));
        assert!(parse_gold_api("g", &json!({"error": "unknown symbol"})).is_err());
    }

    #[test]
    fn test_parse_goldprice_org_prefers_usd() {
        let body = json!({
            "ts": 1700000000000u64,
            "items": [
                {"curr": "EUR", "xauPrice": 2400.0, "xagPrice": 27.0},
                {"curr": "USD", "xauPrice": 2601.5, "xagPrice": 30.5}
            ]
        });
        let reading = parse_goldprice_org("goldprice.org", &body).unwrap();
        assert_eq!(reading.gold, dec!(2601.5));
        assert_eq!(reading.silver, dec!(30.5));
    }

    #[test]
    fn test_parse_goldprice_org_missing_fields() {
        let body = json!({"items": [{"curr": "USD", "xauPrice": 2601.5}]});
        assert!(matches!(
            parse_goldprice_org("g", &body),
            Err(PriceFeedError::MissingField { field: "xagPrice", .. })
        ));
        assert!(parse_goldprice_org("g", &json!({})).is_err());
    }

    #[tokio::test]
    async fn test_fetch_from_source_swallows_errors() {
        let failing = ScriptedSource::failing("down");
        assert!(fetch_from_source(&failing).await.is_none());
        assert_eq!(failing.calls(), 1);

        let ok = ScriptedSource::ok("up", dec!(2600), dec!(30));
        let reading = fetch_from_source(&ok).await.unwrap();
        assert_eq!(reading.gold, dec!(2600));
    }

    #[tokio::test]
    async fn test_unreachable_http_source_yields_none() {
        let config = SourceConfig {
            kind: SourceKind::MetalsLive,
            url: Some("http://127.0.0.1:9/v1/spot".into()),
            name: Some("local".into()),
        };
        let source = HttpPriceSource::new(config, Duration::from_millis(500)).unwrap();
        assert_eq!(source.name(), "local");
        assert!(fetch_from_source(&source).await.is_none());
    }

    /// Serve canned feed responses on an ephemeral local port
    async fn spawn_feed() -> SocketAddr {
        let app = Router::new()
            .route(
                "/spot",
                get(|| async { Json(json!([{"gold": 2601.25, "silver": 30.5}])) }),
            )
            .route("/missing", get(|| async { HttpStatus::NOT_FOUND }))
            .route("/busy", get(|| async { HttpStatus::TOO_MANY_REQUESTS }))
            .route(
                "/price/:symbol",
                get(|Path(symbol): Path<String>| async move {
                    match symbol.as_str() {
                        "XAU" => Ok(Json(json!({"name": "Gold", "price": 2598.5, "symbol": "XAU"}))),
                        "XAG" => Ok(Json(json!({"name": "Silver", "price": 29.75, "symbol": "XAG"}))),
                        _ => Err(HttpStatus::NOT_FOUND),
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn local_source(kind: SourceKind, addr: SocketAddr, path: &str) -> HttpPriceSource {
        let config = SourceConfig {
            kind,
            url: Some(format!("http://{addr}{path}")),
            name: Some("local".into()),
        };
        HttpPriceSource::new(config, Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_http_source_reads_ok_response() {
        let addr = spawn_feed().await;
        let source = local_source(SourceKind::MetalsLive, addr, "/spot");

        let reading = fetch_from_source(&source).await.unwrap();
        assert_eq!(reading.gold, dec!(2601.25));
        assert_eq!(reading.silver, dec!(30.5));
        assert_eq!(reading.source, "local");
    }

    #[tokio::test]
    async fn test_http_source_maps_error_statuses() {
        let addr = spawn_feed().await;

        let missing = local_source(SourceKind::MetalsLive, addr, "/missing");
        assert!(matches!(
            missing.fetch().await,
            Err(PriceFeedError::BadStatus { status: 404, .. })
        ));
        assert!(fetch_from_source(&missing).await.is_none());

        let busy = local_source(SourceKind::GoldpriceOrg, addr, "/busy");
        assert!(matches!(busy.fetch().await, Err(PriceFeedError::RateLimited)));
        assert!(fetch_from_source(&busy).await.is_none());
    }

    #[tokio::test]
    async fn test_gold_api_requests_one_url_per_metal() {
        let addr = spawn_feed().await;

        // trailing slash on the base must not double up
        let source = local_source(SourceKind::GoldApi, addr, "/price/");
        let reading = source.fetch().await.unwrap();
        assert_eq!(reading.gold, dec!(2598.5));
        assert_eq!(reading.silver, dec!(29.75));

        let wrong_base = local_source(SourceKind::GoldApi, addr, "/nowhere");
        assert!(matches!(
            wrong_base.fetch().await,
            Err(PriceFeedError::BadStatus { status: 404, .. })
        ));
    }
}
