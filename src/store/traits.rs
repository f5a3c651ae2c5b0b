use crate::error::ExecutionError;
use crate::search::SqlParam;
use async_trait::async_trait;

/// A result row: column name to scalar value, in select order
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Common trait for relational stores the queries run against.
/// Implementations must tolerate concurrent calls from independent searches.
#[async_trait]
pub trait Store: Send + Sync {
    /// Run one parameterized statement and return every row it produced
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>, ExecutionError>;

    /// Get the name of the store backend
    fn backend_name(&self) -> &'static str;
}
