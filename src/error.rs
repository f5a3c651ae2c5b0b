//! Error types for store access.
//!
//! `ExecutionError` is what a [`Store`](crate::store::Store) reports when a
//! statement cannot be run. `StoreError` wraps it together with the failures
//! that can happen after rows come back.

use thiserror::Error;

/// Failure reported by a store while running a statement.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("{backend} connection failed: {message}")]
    Connection {
        backend: &'static str,
        message: String,
    },

    /// The database rejected or aborted the statement.
    #[error("query failed: {message}")]
    Query {
        message: String,
        /// SQLSTATE code when the backend reports one.
        code: Option<String>,
    },

    #[error("statement has {expected} placeholders but {actual} parameters were supplied")]
    ParameterCount { expected: usize, actual: usize },

    #[error("cannot bind parameter ${index} as {expected}")]
    Bind { index: usize, expected: String },

    #[error("unsupported type {type_name} for column {column}")]
    UnsupportedColumn { column: String, type_name: String },
}

/// Error returned by search and record operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("failed to decode {entity} row: {source}")]
    Decode {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("insert into {table} returned no row")]
    NoRowReturned { table: &'static str },
}

pub type StoreResult<T> = Result<T, StoreError>;
