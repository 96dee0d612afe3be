use crate::context::QueryContext;
use crate::error::Result;
use crate::types::{DataSource, TsdbQuery, TsdbResponse};
use async_trait::async_trait;
use downcast_rs::{impl_downcast, DowncastSync};
use std::sync::Arc;

/// Capability every backend family implements: run a query against one
/// configured data source.
///
/// Implementations must honor `ctx` (stop outstanding work and return
/// `Cancelled`/`DeadlineExceeded` rather than a partial response) and report
/// transport or query failures as backend errors. Per-sub-query failures
/// belong inside the returned [`TsdbResponse`].
#[async_trait]
pub trait QueryExecutor: DowncastSync {
    async fn query(
        &self,
        ctx: &QueryContext,
        ds: &DataSource,
        query: &TsdbQuery,
    ) -> Result<TsdbResponse>;
}

impl_downcast!(sync QueryExecutor);

/// Builds an executor for a data source.
///
/// Construction validates settings only; it must not touch the network.
/// Failures are reported as `InvalidConfiguration`/`InvalidCredentials` and
/// wrapped by the dispatcher into an instantiation error.
pub trait ExecutorFactory: Send + Sync {
    fn create_executor(&self, ds: &DataSource) -> Result<Arc<dyn QueryExecutor>>;
}

impl<F> ExecutorFactory for F
where
    F: Fn(&DataSource) -> Result<Arc<dyn QueryExecutor>> + Send + Sync,
{
    fn create_executor(&self, ds: &DataSource) -> Result<Arc<dyn QueryExecutor>> {
        self(ds)
    }
}

/// Lookup into the externally managed plugin subsystem.
///
/// A returned executor takes precedence over the static registry.
pub trait PluginResolver: Send + Sync {
    fn resolve(&self, source_type: &str) -> Option<Arc<dyn QueryExecutor>>;
}
