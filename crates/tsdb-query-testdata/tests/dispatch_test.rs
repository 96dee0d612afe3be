use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tsdb_query::{
    init_tracing, DataError, DataSource, ExecutorOrigin, ExecutorRegistry, PluginTable, Query,
    QueryContext, TimeRange, TsdbConfig, TsdbQuery, TsdbService,
};
use tsdb_query_testdata::{TestDataExecutor, SOURCE_TYPE};

fn service() -> TsdbService {
    init_tracing(&TsdbConfig::default());
    let registry = tsdb_query_testdata::register(ExecutorRegistry::builder()).build();
    TsdbService::with_registry(Arc::new(registry))
}

fn datasource() -> DataSource {
    DataSource::new(SOURCE_TYPE)
        .with_id(1)
        .with_name("TestData")
        .with_json_data(json!({"seed": 1234}))
}

fn last_hour() -> TimeRange {
    TimeRange::last(chrono::Duration::hours(1))
}

#[tokio::test]
async fn test_random_walk_through_dispatcher() {
    let query = TsdbQuery::new(last_hour()).with_query(
        Query::new("A")
            .with_model(json!({"scenario": "random_walk", "alias": "cpu"}))
            .with_max_data_points(50),
    );

    let response = service()
        .handle_request(&QueryContext::new(), &datasource(), &query)
        .await
        .unwrap();

    let result = response.get("A").unwrap();
    assert!(result.error.is_none());
    assert_eq!(result.series.len(), 1);
    assert_eq!(result.series[0].name, "cpu");
    assert_eq!(result.series[0].points.len(), 50);
}

#[tokio::test]
async fn test_partial_success_is_not_an_error() {
    let query = TsdbQuery::new(last_hour())
        .with_query(Query::new("A"))
        .with_query(Query::new("B").with_model(json!({"scenario": "server_error"})))
        .with_query(Query::new("C").with_model(json!({"scenario": "no_such_scenario"})));

    let response = service()
        .handle_request(&QueryContext::new(), &datasource(), &query)
        .await
        .unwrap();

    assert!(response.is_partial());
    assert_eq!(response.errors(), vec!["B", "C"]);
    assert!(response.get("A").unwrap().error.is_none());
}

#[tokio::test]
async fn test_backend_error_passes_through() {
    let query = TsdbQuery::new(last_hour())
        .with_query(Query::new("A").with_model(json!({"scenario": "backend_error"})));

    let err = service()
        .handle_request(&QueryContext::new(), &datasource(), &query)
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::Backend { retryable: true, .. }));
}

#[tokio::test]
async fn test_invalid_settings_fail_instantiation() {
    let ds = datasource().with_json_data(json!({"seed": -5}));
    let query = TsdbQuery::new(last_hour()).with_query(Query::new("A"));

    let err = service()
        .handle_request(&QueryContext::new(), &ds, &query)
        .await
        .unwrap_err();

    assert!(matches!(&err, DataError::Instantiation { source_type, .. } if source_type == SOURCE_TYPE));
    assert!(matches!(err.cause(), Some(DataError::InvalidConfiguration(_))));
}

#[tokio::test]
async fn test_unknown_type() {
    let query = TsdbQuery::new(last_hour()).with_query(Query::new("A"));

    let err = service()
        .handle_request(&QueryContext::new(), &DataSource::new("unknown-db"), &query)
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::NotFound { ref source_type } if source_type == "unknown-db"));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_slow_query() {
    let query = TsdbQuery::new(last_hour()).with_query(
        Query::new("A").with_model(json!({"scenario": "slow_query", "delay_ms": 60_000})),
    );

    let ctx = QueryContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let err = service()
        .handle_request(&ctx, &datasource(), &query)
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn test_slow_query_deadline() {
    let query = TsdbQuery::new(last_hour()).with_query(
        Query::new("A").with_model(json!({"scenario": "slow_query", "delay_ms": 10_000})),
    );

    let ctx = QueryContext::new().with_timeout(Duration::from_secs(1));
    let err = service()
        .handle_request(&ctx, &datasource(), &query)
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::DeadlineExceeded));
}

#[tokio::test(start_paused = true)]
async fn test_slow_query_completes_in_time() {
    let query = TsdbQuery::new(last_hour()).with_query(
        Query::new("A").with_model(json!({"scenario": "slow_query", "delay_ms": 100})),
    );

    let ctx = QueryContext::new().with_timeout(Duration::from_secs(1));
    let response = service()
        .handle_request(&ctx, &datasource(), &query)
        .await
        .unwrap();

    assert!(response.get("A").unwrap().error.is_none());
}

#[tokio::test]
async fn test_plugin_overrides_testdata() {
    let registry = tsdb_query_testdata::register(ExecutorRegistry::builder()).build();
    let plugins = PluginTable::new();
    plugins.insert(SOURCE_TYPE, Arc::new(TestDataExecutor::new(99)));

    let service = TsdbService::new(Arc::new(registry), Arc::new(plugins));

    // The registry factory would reject this seed; the plugin never looks at it
    let ds = datasource().with_json_data(json!({"seed": "invalid"}));
    let resolved = service.resolve(&ds).unwrap();
    assert_eq!(resolved.origin, ExecutorOrigin::Plugin);

    let testdata = resolved.executor.downcast_arc::<TestDataExecutor>().ok().unwrap();
    assert_eq!(testdata.seed(), 99);
}

#[tokio::test]
async fn test_disabled_backend_is_not_found() {
    let config = TsdbConfig {
        disabled_backends: vec![SOURCE_TYPE.to_string()],
        ..Default::default()
    };
    let registry = tsdb_query_testdata::register(ExecutorRegistry::builder())
        .apply_config(&config)
        .build();
    let service = TsdbService::with_registry(Arc::new(registry));

    let query = TsdbQuery::new(last_hour()).with_query(Query::new("A"));
    let err = service
        .handle_request(&QueryContext::new(), &datasource(), &query)
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::NotFound { .. }));
}
