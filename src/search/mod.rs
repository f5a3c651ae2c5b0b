//! Filtered property search.
//!
//! A search builds a [`QueryPlan`] from the caller's [`SearchOptions`], runs it
//! on the store handle passed in, and decodes the rows into [`Property`]
//! values. An execution failure comes back as `Err`; `Ok(vec![])` only ever
//! means nothing matched.

pub mod builder;
pub mod types;

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::{StoreError, StoreResult};
use crate::models::Property;
use crate::store::Store;

pub use builder::{Comparison, Predicate, QueryPlan, SqlParam};
pub use types::{ResultLimit, SearchOptions};

/// Receives the outcome of every search
pub trait SearchObserver: Send + Sync {
    fn on_plan(&self, _plan: &QueryPlan) {}

    fn on_success(&self, _backend: &str, _plan: &QueryPlan, _rows: usize) {}

    fn on_failure(&self, backend: &str, plan: &QueryPlan, error: &StoreError);
}

/// Logs searches through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SearchObserver for TracingObserver {
    fn on_plan(&self, plan: &QueryPlan) {
        debug!(params = plan.params.len(), "Search query:\n{}", plan.sql);
    }

    fn on_success(&self, backend: &str, _plan: &QueryPlan, rows: usize) {
        debug!(backend, "Search matched {} properties", rows);
    }

    fn on_failure(&self, backend: &str, plan: &QueryPlan, error: &StoreError) {
        error!(
            backend,
            params = plan.params.len(),
            "Property search failed: {}",
            error
        );
    }
}

#[derive(Clone)]
pub struct PropertySearch {
    observer: Arc<dyn SearchObserver>,
}

impl Default for PropertySearch {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertySearch {
    pub fn new() -> Self {
        Self::with_observer(Arc::new(TracingObserver))
    }

    pub fn with_observer(observer: Arc<dyn SearchObserver>) -> Self {
        Self { observer }
    }

    pub async fn search<S>(
        &self,
        store: &S,
        options: &SearchOptions,
        limit: ResultLimit,
    ) -> StoreResult<Vec<Property>>
    where
        S: Store + ?Sized,
    {
        if options.is_empty() {
            debug!("No filters set, listing the cheapest properties");
        }
        let plan = QueryPlan::build(options, limit);
        self.observer.on_plan(&plan);

        let backend = store.backend_name();
        match run(store, &plan).await {
            Ok(properties) => {
                self.observer.on_success(backend, &plan, properties.len());
                Ok(properties)
            }
            Err(e) => {
                self.observer.on_failure(backend, &plan, &e);
                Err(e)
            }
        }
    }
}

async fn run<S>(store: &S, plan: &QueryPlan) -> StoreResult<Vec<Property>>
where
    S: Store + ?Sized,
{
    let rows = store.execute(&plan.sql, &plan.params).await?;
    crate::records::decode_rows(rows, "property")
}

/// Searches with the default logging observer
pub async fn search_properties<S>(
    store: &S,
    options: &SearchOptions,
    limit: ResultLimit,
) -> StoreResult<Vec<Property>>
where
    S: Store + ?Sized,
{
    PropertySearch::new().search(store, options, limit).await
}
