use crate::config::TsdbConfig;
use crate::error::Result;
use crate::traits::{ExecutorFactory, QueryExecutor};
use crate::types::DataSource;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Collects `(type id, factory)` pairs during startup.
///
/// Call [`RegistryBuilder::build`] once all backends are registered; the
/// resulting [`ExecutorRegistry`] cannot be modified. Disabled backend
/// types are dropped in `build`, whatever the order of calls.
#[derive(Default)]
pub struct RegistryBuilder {
    factories: HashMap<String, Arc<dyn ExecutorFactory>>,
    disabled: HashSet<String>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a factory to a backend type, replacing any previous binding
    pub fn register(
        mut self,
        source_type: impl Into<String>,
        factory: Arc<dyn ExecutorFactory>,
    ) -> Self {
        let source_type = source_type.into();

        if self.factories.contains_key(&source_type) {
            warn!("Overwriting existing factory for backend: {}", source_type);
        }

        debug!("Registered factory for backend: {}", source_type);
        self.factories.insert(source_type, factory);
        self
    }

    /// Bind a constructor function to a backend type
    pub fn register_fn<F>(self, source_type: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&DataSource) -> Result<Arc<dyn QueryExecutor>> + Send + Sync + 'static,
    {
        self.register(source_type, Arc::new(factory))
    }

    /// Exclude a backend type from the built registry
    pub fn disable(mut self, source_type: impl Into<String>) -> Self {
        self.disabled.insert(source_type.into());
        self
    }

    /// Remove every backend listed in `config.disabled_backends`
    pub fn apply_config(self, config: &TsdbConfig) -> Self {
        config
            .disabled_backends
            .iter()
            .fold(self, |builder, backend| builder.disable(backend.as_str()))
    }

    pub fn build(mut self) -> ExecutorRegistry {
        for source_type in &self.disabled {
            if self.factories.remove(source_type).is_some() {
                warn!("Backend disabled by configuration: {}", source_type);
            }
        }

        debug!(
            "Static executor registry built with {} backends",
            self.factories.len()
        );
        ExecutorRegistry {
            factories: self.factories,
        }
    }
}

/// Read-only mapping from backend type to executor factory.
///
/// Lookups are exact and case-sensitive. Share it behind an `Arc`; no
/// locking is needed since nothing can mutate it after construction.
pub struct ExecutorRegistry {
    factories: HashMap<String, Arc<dyn ExecutorFactory>>,
}

impl ExecutorRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// A registry with no backends
    pub fn empty() -> Self {
        RegistryBuilder::new().build()
    }

    pub fn lookup(&self, source_type: &str) -> Option<&Arc<dyn ExecutorFactory>> {
        self.factories.get(source_type)
    }

    pub fn contains(&self, source_type: &str) -> bool {
        self.factories.contains_key(source_type)
    }

    /// Registered backend types, sorted
    pub fn backends(&self) -> Vec<&str> {
        let mut backends: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        backends.sort_unstable();
        backends
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("backends", &self.backends())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::QueryContext;
    use crate::error::DataError;
    use crate::types::{TsdbQuery, TsdbResponse};
    use async_trait::async_trait;

    struct NullExecutor;

    #[async_trait]
    impl QueryExecutor for NullExecutor {
        async fn query(
            &self,
            _ctx: &QueryContext,
            _ds: &DataSource,
            _query: &TsdbQuery,
        ) -> Result<TsdbResponse> {
            Ok(TsdbResponse::new())
        }
    }

    fn null_factory(_ds: &DataSource) -> Result<Arc<dyn QueryExecutor>> {
        Ok(Arc::new(NullExecutor))
    }

    fn failing_factory(_ds: &DataSource) -> Result<Arc<dyn QueryExecutor>> {
        Err(DataError::invalid_configuration("always fails"))
    }

    #[test]
    fn test_registry_creation() {
        let registry = ExecutorRegistry::empty();
        assert!(registry.is_empty());
        assert!(registry.lookup("graphite").is_none());
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ExecutorRegistry::builder()
            .register_fn("graphite", null_factory)
            .register_fn("prometheus", null_factory)
            .build();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("graphite"));
        assert!(registry.lookup("prometheus").is_some());
        assert_eq!(registry.backends(), vec!["graphite", "prometheus"]);
    }

    #[test]
    fn test_lookup_is_exact() {
        let registry = ExecutorRegistry::builder()
            .register_fn("graphite", null_factory)
            .build();

        assert!(registry.lookup("Graphite").is_none());
        assert!(registry.lookup("graph").is_none());
        assert!(registry.lookup("graphite ").is_none());
    }

    #[test]
    fn test_register_overwrites() {
        let registry = ExecutorRegistry::builder()
            .register_fn("mysql", failing_factory)
            .register_fn("mysql", null_factory)
            .build();

        assert_eq!(registry.len(), 1);
        let factory = registry.lookup("mysql").unwrap();
        assert!(factory.create_executor(&DataSource::new("mysql")).is_ok());
    }

    #[test]
    fn test_apply_config_disables_backends() {
        let config = TsdbConfig {
            disabled_backends: vec!["opentsdb".to_string(), "absent".to_string()],
            ..Default::default()
        };

        let registry = ExecutorRegistry::builder()
            .register_fn("opentsdb", null_factory)
            .register_fn("influxdb", null_factory)
            .apply_config(&config)
            .build();

        assert_eq!(registry.backends(), vec!["influxdb"]);
    }

    #[test]
    fn test_disabled_backend_stays_out_when_registered_later() {
        let config = TsdbConfig {
            disabled_backends: vec!["opentsdb".to_string()],
            ..Default::default()
        };

        let registry = ExecutorRegistry::builder()
            .apply_config(&config)
            .register_fn("opentsdb", null_factory)
            .register_fn("influxdb", null_factory)
            .disable("mssql")
            .register_fn("mssql", null_factory)
            .build();

        assert_eq!(registry.backends(), vec!["influxdb"]);
        assert!(registry.lookup("opentsdb").is_none());
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ExecutorRegistry>();
    }
}
