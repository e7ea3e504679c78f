//! Core types and utilities for the household dashboard
//!
//! This crate provides shared types used across all components:
//! - Metal and money types, including cent rounding
//! - List items and the shopping list model
//! - Precious-metal holdings and portfolio valuation
//! - An explicitly owned TTL cache
//! - Configuration and error types

pub mod types;
pub mod prices;
pub mod list;
pub mod shopping;
pub mod holdings;
pub mod cache;
pub mod config;
pub mod errors;

pub use types::*;
pub use prices::*;
pub use list::*;
pub use shopping::*;
pub use holdings::*;
pub use cache::*;
pub use config::*;
pub use errors::*;
