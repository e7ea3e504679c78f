//! HTTP routes

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use homeboard_core::{
    now_ms, HoldingDraft, HoldingValuation, Metal, MetalHolding, MetalHoldingPatch,
    PortfolioStats, ShoppingItem, ShoppingItemDraft, ShoppingItemPatch,
};

use crate::error::ApiResult;
use crate::service::HomeboardService;

pub fn router(service: HomeboardService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metal-prices", get(metal_prices))
        .route("/update-metal-prices", post(update_metal_prices))
        .route("/shopping", get(list_shopping).post(add_shopping))
        .route("/shopping/clear-completed", post(clear_completed))
        .route(
            "/shopping/:id",
            patch(update_shopping).delete(delete_shopping),
        )
        .route("/shopping/:id/toggle", post(toggle_shopping))
        .route("/holdings", get(list_holdings).post(add_holding))
        .route("/holdings/stats", get(holdings_stats))
        .route("/holdings/valued", get(valued_holdings))
        .route(
            "/holdings/:id",
            patch(update_holding).delete(delete_holding),
        )
        .route("/holdings/:id/sell", post(sell_holding))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

async fn health(State(service): State<HomeboardService>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": service.uptime().as_secs(),
    }))
}

// ---------------------------------------------------------------------------
// Metal prices
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct PricesResponse {
    gold: i64,
    silver: i64,
    updated_at: Option<DateTime<Utc>>,
    timestamp: i64,
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    success: bool,
    gold: i64,
    silver: i64,
    timestamp: i64,
}

async fn metal_prices(State(service): State<HomeboardService>) -> ApiResult<Json<PricesResponse>> {
    let price = service.current_prices().await?;
    Ok(Json(PricesResponse {
        gold: price.gold_cents,
        silver: price.silver_cents,
        updated_at: price.updated_at,
        timestamp: now_ms(),
    }))
}

async fn update_metal_prices(
    State(service): State<HomeboardService>,
) -> ApiResult<Json<UpdateResponse>> {
    info!("Manual metal price update requested");
    let price = service.refresh_prices().await?;
    Ok(Json(UpdateResponse {
        success: true,
        gold: price.gold_cents,
        silver: price.silver_cents,
        timestamp: now_ms(),
    }))
}

// ---------------------------------------------------------------------------
// Shopping list
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ToggleRequest {
    completed: bool,
}

async fn list_shopping(State(service): State<HomeboardService>) -> Json<Vec<ShoppingItem>> {
    Json(service.shopping().list())
}

async fn add_shopping(
    State(service): State<HomeboardService>,
    Json(draft): Json<ShoppingItemDraft>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let item = service.shopping().add(draft)?;
    Ok((StatusCode::CREATED, Json(json!({ "id": item.id }))))
}

async fn toggle_shopping(
    State(service): State<HomeboardService>,
    Path(id): Path<String>,
    Json(request): Json<ToggleRequest>,
) -> ApiResult<Json<ShoppingItem>> {
    Ok(Json(service.shopping().toggle(&id, request.completed)?))
}

async fn update_shopping(
    State(service): State<HomeboardService>,
    Path(id): Path<String>,
    Json(patch): Json<ShoppingItemPatch>,
) -> ApiResult<Json<ShoppingItem>> {
    Ok(Json(service.shopping().update(&id, &patch)?))
}

async fn delete_shopping(
    State(service): State<HomeboardService>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    service.shopping().remove(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_completed(State(service): State<HomeboardService>) -> Json<Value> {
    let removed = service.shopping().clear_completed();
    Json(json!({ "removed": removed }))
}

// ---------------------------------------------------------------------------
// Holdings
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct HoldingsQuery {
    #[serde(default)]
    active: bool,
    #[serde(default)]
    metal: Option<Metal>,
}

#[derive(Debug, Deserialize)]
struct SellRequest {
    sold_price_per_oz: i64,
}

async fn list_holdings(
    State(service): State<HomeboardService>,
    Query(query): Query<HoldingsQuery>,
) -> Json<Vec<MetalHolding>> {
    let holdings = match query.metal {
        Some(metal) => service.holdings().list_by_metal(metal),
        None => service.holdings().list(),
    };
    Json(
        holdings
            .into_iter()
            .filter(|h| !query.active || h.is_active())
            .collect(),
    )
}

async fn add_holding(
    State(service): State<HomeboardService>,
    Json(draft): Json<HoldingDraft>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let holding = service.holdings().add(draft)?;
    Ok((StatusCode::CREATED, Json(json!({ "id": holding.id }))))
}

async fn update_holding(
    State(service): State<HomeboardService>,
    Path(id): Path<String>,
    Json(patch): Json<MetalHoldingPatch>,
) -> ApiResult<Json<MetalHolding>> {
    Ok(Json(service.holdings().update(&id, &patch)?))
}

async fn sell_holding(
    State(service): State<HomeboardService>,
    Path(id): Path<String>,
    Json(request): Json<SellRequest>,
) -> ApiResult<Json<MetalHolding>> {
    Ok(Json(service.holdings().sell(&id, request.sold_price_per_oz)?))
}

async fn delete_holding(
    State(service): State<HomeboardService>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    service.holdings().remove(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn holdings_stats(
    State(service): State<HomeboardService>,
) -> ApiResult<Json<PortfolioStats>> {
    let prices = service.current_prices().await?;
    Ok(Json(service.holdings().portfolio_stats(&prices)))
}

async fn valued_holdings(
    State(service): State<HomeboardService>,
) -> ApiResult<Json<Vec<HoldingValuation>>> {
    let prices = service.current_prices().await?;
    Ok(Json(service.holdings().valued(&prices)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use homeboard_core::{PriceFeedError, PriceFeedResult, PriceReading};
    use homeboard_price_feed::{MemorySettingsStore, PriceReconciler, PriceSource, SettingsStore};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    struct FixedSource {
        reading: Option<(&'static str, &'static str)>,
    }

    #[async_trait::async_trait]
    impl PriceSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch(&self) -> PriceFeedResult<PriceReading> {
            match self.reading {
                Some((gold, silver)) => Ok(PriceReading::new(
                    "fixed",
                    Decimal::from_str(gold).unwrap(),
                    Decimal::from_str(silver).unwrap(),
                )),
                None => Err(PriceFeedError::BadStatus {
                    source_name: "fixed".into(),
                    status: 502,
                }),
            }
        }
    }

    fn app_with(readings: Vec<Option<(&'static str, &'static str)>>) -> Router {
        let sources: Vec<Arc<dyn PriceSource>> = readings
            .into_iter()
            .map(|reading| Arc::new(FixedSource { reading }) as Arc<dyn PriceSource>)
            .collect();
        let store: Arc<dyn SettingsStore> = Arc::new(MemorySettingsStore::new());
        let reconciler = Arc::new(PriceReconciler::new(sources, store));
        router(HomeboardService::new(reconciler, Duration::from_secs(60)))
    }

    fn app() -> Router {
        app_with(vec![
            Some(("2600.00", "30.00")),
            Some(("2601.50", "30.10")),
            Some(("2599.75", "29.90")),
        ])
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_prices_cold_then_updated() {
        let app = app();

        let (status, body) = send(&app, "GET", "/metal-prices", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gold"], 0);
        assert_eq!(body["silver"], 0);
        assert!(body["updated_at"].is_null());

        let (status, body) = send(&app, "POST", "/update-metal-prices", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["gold"], 260_000);
        assert_eq!(body["silver"], 3_000);

        let (_, body) = send(&app, "GET", "/metal-prices", None).await;
        assert_eq!(body["gold"], 260_000);
        assert!(body["updated_at"].is_string());
    }

    #[tokio::test]
    async fn test_update_fails_when_every_source_fails() {
        let app = app_with(vec![None, None]);

        let (status, body) = send(&app, "POST", "/update-metal-prices", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("Failed to update"));

        let (_, body) = send(&app, "GET", "/metal-prices", None).await;
        assert_eq!(body["gold"], 0);
    }

    #[tokio::test]
    async fn test_shopping_lifecycle() {
        let app = app();

        let (status, body) = send(
            &app,
            "POST",
            "/shopping",
            Some(json!({ "item": "Milk", "priority": "urgent", "category": "groceries" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();

        send(&app, "POST", "/shopping", Some(json!({ "item": "Soap" }))).await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/shopping/{id}/toggle"),
            Some(json!({ "completed": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["completed"], true);

        let (_, body) = send(&app, "GET", "/shopping", None).await;
        let names: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["item"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Soap", "Milk"]);

        let (_, body) = send(&app, "POST", "/shopping/clear-completed", None).await;
        assert_eq!(body["removed"], 1);

        let (status, _) = send(&app, "DELETE", &format!("/shopping/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_shopping_patch_and_validation() {
        let app = app();

        let (status, _) = send(&app, "POST", "/shopping", Some(json!({ "item": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&app, "POST", "/shopping", Some(json!({ "item": "Eggs" }))).await;
        let id = body["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            "PATCH",
            &format!("/shopping/{id}"),
            Some(json!({ "quantity": "12" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["quantity"], "12");
        assert_eq!(body["item"], "Eggs");

        let (status, _) = send(&app, "DELETE", &format!("/shopping/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_holdings_and_stats() {
        let app = app();
        send(&app, "POST", "/update-metal-prices", None).await;

        let (status, body) = send(
            &app,
            "POST",
            "/holdings",
            Some(json!({
                "metal": "gold",
                "quantity_oz": 2.0,
                "purchase_price_per_oz": 200_000,
                "purchase_date": "2024-01-15T00:00:00Z",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let gold_id = body["id"].as_str().unwrap().to_string();

        send(
            &app,
            "POST",
            "/holdings",
            Some(json!({
                "metal": "silver",
                "quantity_oz": 10.0,
                "purchase_price_per_oz": 2_500,
                "purchase_date": "2024-03-01T00:00:00Z",
            })),
        )
        .await;

        let (_, stats) = send(&app, "GET", "/holdings/stats", None).await;
        assert_eq!(stats["gold_oz"], 2.0);
        assert_eq!(stats["total_invested"], 425_000.0);
        assert_eq!(stats["total_current_value"], 550_000.0);

        let (status, body) = send(
            &app,
            "POST",
            &format!("/holdings/{gold_id}/sell"),
            Some(json!({ "sold_price_per_oz": 260_000 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["sold_date"].is_string());

        let (_, active) = send(&app, "GET", "/holdings?active=true", None).await;
        assert_eq!(active.as_array().unwrap().len(), 1);
        let (_, all) = send(&app, "GET", "/holdings", None).await;
        assert_eq!(all.as_array().unwrap().len(), 2);

        let (_, stats) = send(&app, "GET", "/holdings/stats", None).await;
        assert_eq!(stats["gold_oz"], 0.0);
        assert_eq!(stats["silver_oz"], 10.0);
    }

    #[tokio::test]
    async fn test_holdings_metal_filter_and_valuation() {
        let app = app();
        send(&app, "POST", "/update-metal-prices", None).await;

        for (metal, oz, price, date) in [
            ("gold", 1.0, 200_000, "2024-01-15T00:00:00Z"),
            ("silver", 10.0, 2_500, "2024-03-01T00:00:00Z"),
            ("gold", 0.5, 250_000, "2024-06-01T00:00:00Z"),
        ] {
            let (status, _) = send(
                &app,
                "POST",
                "/holdings",
                Some(json!({
                    "metal": metal,
                    "quantity_oz": oz,
                    "purchase_price_per_oz": price,
                    "purchase_date": date,
                })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, gold) = send(&app, "GET", "/holdings?metal=gold", None).await;
        assert_eq!(status, StatusCode::OK);
        let gold = gold.as_array().unwrap();
        assert_eq!(gold.len(), 2);
        assert_eq!(gold[0]["quantity_oz"], 0.5);
        let first_gold = gold[1]["id"].as_str().unwrap().to_string();

        send(
            &app,
            "POST",
            &format!("/holdings/{first_gold}/sell"),
            Some(json!({ "sold_price_per_oz": 260_000 })),
        )
        .await;
        let (_, active_gold) = send(&app, "GET", "/holdings?metal=gold&active=true", None).await;
        assert_eq!(active_gold.as_array().unwrap().len(), 1);

        let (status, _) = send(&app, "GET", "/holdings?metal=platinum", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, valued) = send(&app, "GET", "/holdings/valued", None).await;
        assert_eq!(status, StatusCode::OK);
        let valued = valued.as_array().unwrap();
        assert_eq!(valued.len(), 2);
        // gold reconciles to 2600.00, silver to 30.00
        assert_eq!(valued[0]["metal"], "gold");
        assert_eq!(valued[0]["current_price"], 260_000);
        assert_eq!(valued[0]["gain_loss"], 5_000.0);
        assert_eq!(valued[1]["metal"], "silver");
        assert_eq!(valued[1]["current_value"], 30_000.0);
        assert_eq!(valued[1]["gain_loss_percent"], 20.0);
    }
}
