use crate::context::QueryContext;
use crate::error::{DataError, Result};
use crate::plugin::NoPlugins;
use crate::registry::ExecutorRegistry;
use crate::traits::{PluginResolver, QueryExecutor};
use crate::types::{DataSource, TsdbQuery, TsdbResponse};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// Where the executor for a request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorOrigin {
    /// Supplied by the plugin resolver
    Plugin,
    /// Built by a factory of the static registry
    Registry,
}

impl fmt::Display for ExecutorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorOrigin::Plugin => write!(f, "plugin"),
            ExecutorOrigin::Registry => write!(f, "registry"),
        }
    }
}

pub struct ResolvedExecutor {
    pub executor: Arc<dyn QueryExecutor>,
    pub origin: ExecutorOrigin,
}

/// Routes TSDB queries to the executor of their data source type.
///
/// Resolution runs in two stages: the plugin resolver is asked first and
/// wins whenever it has an executor; otherwise the static registry's
/// factory for the type builds one. The service holds no per-request
/// state and is cheap to clone.
#[derive(Clone)]
pub struct TsdbService {
    registry: Arc<ExecutorRegistry>,
    plugins: Arc<dyn PluginResolver>,
}

impl TsdbService {
    pub fn new(registry: Arc<ExecutorRegistry>, plugins: Arc<dyn PluginResolver>) -> Self {
        Self { registry, plugins }
    }

    /// A service that only consults the static registry
    pub fn with_registry(registry: Arc<ExecutorRegistry>) -> Self {
        Self::new(registry, Arc::new(NoPlugins))
    }

    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    /// Run `query` against `ds` with the executor matching `ds.source_type`.
    ///
    /// `ctx` is handed to the executor unchanged; the executor's result,
    /// success or error, is returned as is.
    pub async fn handle_request(
        &self,
        ctx: &QueryContext,
        ds: &DataSource,
        query: &TsdbQuery,
    ) -> Result<TsdbResponse> {
        let resolved = self.resolve(ds)?;

        debug!(
            "Executing {} queries against {} ({}) via {}",
            query.queries.len(),
            ds.name,
            ds.source_type,
            resolved.origin
        );

        resolved.executor.query(ctx, ds, query).await
    }

    /// Pick the executor for `ds` without running anything
    pub fn resolve(&self, ds: &DataSource) -> Result<ResolvedExecutor> {
        if let Some(executor) = self.resolve_plugin(&ds.source_type) {
            return Ok(ResolvedExecutor {
                executor,
                origin: ExecutorOrigin::Plugin,
            });
        }

        self.resolve_static(ds).map(|executor| ResolvedExecutor {
            executor,
            origin: ExecutorOrigin::Registry,
        })
    }

    fn resolve_plugin(&self, source_type: &str) -> Option<Arc<dyn QueryExecutor>> {
        let executor = self.plugins.resolve(source_type);
        if executor.is_some() {
            debug!("Using plugin executor for data source type: {}", source_type);
        }
        executor
    }

    fn resolve_static(&self, ds: &DataSource) -> Result<Arc<dyn QueryExecutor>> {
        let factory = self.registry.lookup(&ds.source_type).ok_or_else(|| {
            error!(
                "No plugin or factory registered for data source type: {}",
                ds.source_type
            );
            DataError::not_found(&ds.source_type)
        })?;

        factory.create_executor(ds).map_err(|e| {
            error!(
                "Failed to instantiate executor for {}: {}",
                ds.display_target(),
                e
            );
            DataError::instantiation(&ds.source_type, e)
        })
    }
}

impl fmt::Debug for TsdbService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TsdbService")
            .field("registry", &self.registry)
            .field("plugins", &"<resolver>")
            .finish()
    }
}
