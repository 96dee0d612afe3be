use crate::traits::{PluginResolver, QueryExecutor};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Resolver for deployments without a plugin subsystem
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPlugins;

impl PluginResolver for NoPlugins {
    fn resolve(&self, _source_type: &str) -> Option<Arc<dyn QueryExecutor>> {
        None
    }
}

/// Executors supplied by an external plugin manager, keyed by backend type.
///
/// The plugin manager may load and unload entries while requests are being
/// served, so the table is internally synchronized. The dispatcher only
/// reads from it.
#[derive(Default)]
pub struct PluginTable {
    plugins: RwLock<HashMap<String, Arc<dyn QueryExecutor>>>,
}

impl PluginTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a plugin executor, returning the one it replaced
    pub fn insert(
        &self,
        source_type: impl Into<String>,
        executor: Arc<dyn QueryExecutor>,
    ) -> Option<Arc<dyn QueryExecutor>> {
        let source_type = source_type.into();
        debug!("Plugin loaded for backend: {}", source_type);
        self.write().insert(source_type, executor)
    }

    pub fn remove(&self, source_type: &str) -> Option<Arc<dyn QueryExecutor>> {
        let removed = self.write().remove(source_type);
        if removed.is_some() {
            debug!("Plugin unloaded for backend: {}", source_type);
        }
        removed
    }

    /// Backend types currently served by plugins, sorted
    pub fn plugin_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.read().keys().cloned().collect();
        types.sort_unstable();
        types
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<dyn QueryExecutor>>> {
        // Poisoning is ignored: every write is a single map operation
        self.plugins.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<dyn QueryExecutor>>> {
        self.plugins.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl PluginResolver for PluginTable {
    fn resolve(&self, source_type: &str) -> Option<Arc<dyn QueryExecutor>> {
        self.read().get(source_type).cloned()
    }
}
