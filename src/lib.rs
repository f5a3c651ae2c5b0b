//! Filtered property search over a LightBnB-style PostgreSQL schema.
//!
//! The core is [`search::QueryPlan`], which turns a sparse
//! [`search::SearchOptions`] into one parameterized aggregate query. Execution
//! goes through the [`store::Store`] trait so callers own the connection
//! handle and tests can substitute their own.

pub mod config;
pub mod error;
pub mod models;
pub mod records;
pub mod search;
pub mod store;

pub use config::StoreConfig;
pub use error::{ExecutionError, StoreError, StoreResult};
pub use search::{search_properties, PropertySearch, QueryPlan, ResultLimit, SearchOptions};
pub use store::{PgStore, Store};
