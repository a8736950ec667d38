//! Steam storefront reports: raw appdetails JSON → SQLite games table →
//! country filter → focus view → chart + summary prompt → report export.

pub mod cli;
pub mod config;
pub mod database_ops;
pub mod normalization;
pub mod report;

pub mod util {
    pub mod env;
    pub mod tracing;
}

pub use config::AppConfig;
pub use database_ops::db::{GameRow, MemoryStore, RowStore, SqliteStore};
pub use database_ops::exchange::ExchangeRates;
