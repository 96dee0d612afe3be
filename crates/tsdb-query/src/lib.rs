//! # tsdb-query
//!
//! Routes time-series queries to the executor of their data source type.
//!
//! A [`TsdbService`] receives a query bound to a [`DataSource`] and picks
//! the executor for `ds.source_type` in two stages:
//!
//! 1. **Plugins**: a [`PluginResolver`] may supply a ready executor. A hit
//!    always wins, which lets backends migrated to the plugin system
//!    override their built-in implementation.
//! 2. **Static registry**: otherwise the [`ExecutorFactory`] registered
//!    under the type in the [`ExecutorRegistry`] builds one.
//!
//! Unknown types fail with [`DataError::NotFound`], factory failures with
//! [`DataError::Instantiation`]. Anything the executor returns, including
//! cancellation, is passed back unchanged.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tsdb_query::{
//!     DataSource, ExecutorRegistry, QueryContext, QueryExecutor, TimeRange, TsdbQuery,
//!     TsdbService,
//! };
//!
//! # async fn example() -> tsdb_query::Result<()> {
//! # fn graphite_executor(_ds: &DataSource) -> tsdb_query::Result<Arc<dyn QueryExecutor>> {
//! #     Err(tsdb_query::DataError::invalid_configuration("example"))
//! # }
//! // Register backends once during startup
//! let registry = ExecutorRegistry::builder()
//!     .register_fn("graphite", graphite_executor)
//!     .build();
//!
//! let service = TsdbService::with_registry(Arc::new(registry));
//!
//! let ds = DataSource::new("graphite").with_url("http://localhost:8080");
//! let query = TsdbQuery::new(TimeRange::last(chrono::Duration::hours(1)));
//! let response = service
//!     .handle_request(&QueryContext::new(), &ds, &query)
//!     .await?;
//! # let _ = response;
//! # Ok(())
//! # }
//! ```
//!
//! ## Backend Implementation
//!
//! To add a backend family:
//!
//! 1. Implement [`QueryExecutor`], running I/O through [`QueryContext::run`]
//! 2. Provide a factory (a function or an [`ExecutorFactory`] impl) that
//!    validates the data source settings without touching the network
//! 3. Register it with [`RegistryBuilder`] before building the service
//!
//! Example backend crates:
//! - `tsdb-query-testdata` - synthetic series for testing dashboards

pub mod config;
pub mod context;
pub mod error;
pub mod plugin;
pub mod registry;
pub mod service;
pub mod telemetry;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use config::TsdbConfig;
pub use context::QueryContext;
pub use error::{DataError, Result};
pub use plugin::{NoPlugins, PluginTable};
pub use registry::{ExecutorRegistry, RegistryBuilder};
pub use service::{ExecutorOrigin, ResolvedExecutor, TsdbService};
pub use telemetry::init_tracing;
pub use traits::{ExecutorFactory, PluginResolver, QueryExecutor};
pub use types::{
    DataSource, Query, QueryResult, Table, TableColumn, TimePoint, TimeRange, TimeSeries,
    TsdbQuery, TsdbResponse,
};
