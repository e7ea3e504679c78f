//! Homeboard HTTP backend
//!
//! JSON API over the price reconciler, the shopping list and the metal
//! holdings ledger.

pub mod config;
pub mod error;
pub mod holdings;
pub mod routes;
pub mod server;
pub mod service;
pub mod shopping;

pub use config::{load_config, load_config_from};
pub use error::{ApiError, ApiResult};
pub use holdings::HoldingsStore;
pub use routes::router;
pub use server::HttpServer;
pub use service::HomeboardService;
pub use shopping::ShoppingListStore;
