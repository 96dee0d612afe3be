//! Synthetic backend for the tsdb-query dispatcher
//!
//! The `testdata` backend produces series without talking to any external
//! system. It is useful for dashboards under development and as the
//! reference implementation of [`QueryExecutor`].
//!
//! ## Scenarios
//!
//! Each sub-query selects a scenario through `model.scenario`:
//! - `random_walk` (default): one deterministic random-walk series
//! - `csv_metric_values`: the numbers in `model.values` spread over the range
//! - `no_data_points`: a successful result without series
//! - `server_error`: the sub-query fails inside an otherwise successful response
//! - `backend_error`: the whole request fails with a retryable backend error
//! - `slow_query`: waits `model.delay_ms` before answering, honoring cancellation
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tsdb_query::{ExecutorRegistry, TsdbService};
//!
//! let registry = tsdb_query_testdata::register(ExecutorRegistry::builder()).build();
//! let service = TsdbService::with_registry(Arc::new(registry));
//! ```

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tsdb_query::{
    DataError, DataSource, Query, QueryContext, QueryExecutor, QueryResult, RegistryBuilder,
    Result, TimePoint, TimeRange, TimeSeries, TsdbQuery, TsdbResponse,
};
use tracing::{debug, error};

/// Backend type served by this crate
pub const SOURCE_TYPE: &str = "testdata";

/// Default spacing between generated points
const DEFAULT_STEP_MS: i64 = 60_000;
/// Upper bound on generated points per series
const MAX_POINTS: usize = 10_000;

/// Register the testdata backend
pub fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder.register_fn(SOURCE_TYPE, new_executor)
}

/// Factory for the testdata backend
///
/// Validates `url` (absolute URL if present) and `json_data.seed`
/// (unsigned integer if present).
pub fn new_executor(ds: &DataSource) -> Result<Arc<dyn QueryExecutor>> {
    if let Some(raw) = &ds.url {
        url::Url::parse(raw).map_err(|e| {
            DataError::invalid_configuration(format!("invalid url {:?}: {}", raw, e))
        })?;
    }

    let seed = match ds.setting("seed") {
        None | Some(serde_json::Value::Null) => ds.id as u64,
        Some(value) => value.as_u64().ok_or_else(|| {
            DataError::invalid_configuration(format!(
                "json_data.seed must be an unsigned integer, got {}",
                value
            ))
        })?,
    };

    debug!("Creating testdata executor for {} (seed {})", ds.name, seed);

    Ok(Arc::new(TestDataExecutor::new(seed)))
}

/// Per sub-query settings read from `Query::model`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScenarioModel {
    scenario: Option<String>,
    alias: Option<String>,
    values: Option<String>,
    delay_ms: Option<u64>,
    start_value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scenario {
    RandomWalk,
    CsvMetricValues,
    NoDataPoints,
    ServerError,
    BackendError,
    SlowQuery,
}

impl Scenario {
    fn parse(name: Option<&str>) -> std::result::Result<Self, String> {
        match name.unwrap_or("random_walk") {
            "random_walk" => Ok(Scenario::RandomWalk),
            "csv_metric_values" => Ok(Scenario::CsvMetricValues),
            "no_data_points" => Ok(Scenario::NoDataPoints),
            "server_error" => Ok(Scenario::ServerError),
            "backend_error" => Ok(Scenario::BackendError),
            "slow_query" => Ok(Scenario::SlowQuery),
            other => Err(format!("unknown scenario {:?}", other)),
        }
    }
}

/// Executor producing synthetic series
#[derive(Debug, Clone)]
pub struct TestDataExecutor {
    seed: u64,
}

impl TestDataExecutor {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    async fn run_query(
        &self,
        ctx: &QueryContext,
        range: &TimeRange,
        query: &Query,
    ) -> Result<QueryResult> {
        let model: ScenarioModel = if query.model.is_null() {
            ScenarioModel::default()
        } else {
            match serde_json::from_value(query.model.clone()) {
                Ok(model) => model,
                Err(e) => {
                    return Ok(QueryResult::failed(
                        query.ref_id.clone(),
                        format!("invalid query model: {}", e),
                    ))
                }
            }
        };

        let scenario = match Scenario::parse(model.scenario.as_deref()) {
            Ok(scenario) => scenario,
            Err(msg) => return Ok(QueryResult::failed(query.ref_id.clone(), msg)),
        };

        let name = model
            .alias
            .clone()
            .unwrap_or_else(|| format!("{}-series", query.ref_id));

        match scenario {
            Scenario::RandomWalk => Ok(QueryResult::ok(query.ref_id.clone())
                .with_series(self.random_walk(name, range, query, model.start_value))),
            Scenario::CsvMetricValues => {
                let raw = model.values.as_deref().unwrap_or_default();
                match csv_metric_values(name, range, raw) {
                    Ok(series) => Ok(QueryResult::ok(query.ref_id.clone()).with_series(series)),
                    Err(msg) => Ok(QueryResult::failed(query.ref_id.clone(), msg)),
                }
            }
            Scenario::NoDataPoints => Ok(QueryResult::ok(query.ref_id.clone())),
            Scenario::ServerError => Ok(QueryResult::failed(
                query.ref_id.clone(),
                "simulated server error",
            )),
            Scenario::BackendError => Err(DataError::backend(
                format!("simulated backend failure for query {}", query.ref_id),
                true,
            )),
            Scenario::SlowQuery => {
                let delay = Duration::from_millis(model.delay_ms.unwrap_or(5_000));
                ctx.sleep(delay).await?;
                Ok(QueryResult::ok(query.ref_id.clone())
                    .with_series(self.random_walk(name, range, query, model.start_value)))
            }
        }
    }

    fn random_walk(
        &self,
        name: String,
        range: &TimeRange,
        query: &Query,
        start_value: Option<f64>,
    ) -> TimeSeries {
        let mut rng = StdRng::seed_from_u64(self.seed ^ ref_id_hash(&query.ref_id));
        let mut value = start_value.unwrap_or_else(|| rng.gen_range(0.0..100.0));

        let mut series = TimeSeries::new(name);
        series.points = timestamps(range, query)
            .into_iter()
            .map(|ts| {
                value += rng.gen_range(-0.5..0.5);
                TimePoint(Some(value), ts)
            })
            .collect();
        series
    }
}

#[async_trait]
impl QueryExecutor for TestDataExecutor {
    async fn query(
        &self,
        ctx: &QueryContext,
        ds: &DataSource,
        query: &TsdbQuery,
    ) -> Result<TsdbResponse> {
        let mut response = TsdbResponse::new();

        for q in &query.queries {
            if let Some(err) = ctx.err() {
                return Err(err);
            }

            let result = self
                .run_query(ctx, &query.time_range, q)
                .await
                .map_err(|e| {
                    if e.is_cancellation() {
                        debug!("testdata query {} on {} stopped: {}", q.ref_id, ds.name, e);
                    } else {
                        error!("testdata query {} on {} failed: {}", q.ref_id, ds.name, e);
                    }
                    e
                })?;
            response.insert(result);
        }

        debug!(
            "testdata answered {} queries ({} failed)",
            response.results.len(),
            response.errors().len()
        );

        Ok(response)
    }
}

/// Timestamps across `range`, spaced by the query interval
fn timestamps(range: &TimeRange, query: &Query) -> Vec<i64> {
    let from = range.from_millis();
    let to = range.to_millis();
    if to < from {
        return Vec::new();
    }

    let span = to - from;
    let step = if query.interval_ms > 0 {
        query.interval_ms
    } else if query.max_data_points > 0 {
        (span / query.max_data_points).max(1)
    } else {
        DEFAULT_STEP_MS
    };

    let limit = if query.max_data_points > 0 {
        (query.max_data_points as usize).min(MAX_POINTS)
    } else {
        MAX_POINTS
    };

    // Stops at the end of the range or when the next step would overflow
    std::iter::successors(Some(from), |ts| ts.checked_add(step))
        .take_while(|ts| *ts <= to)
        .take(limit)
        .collect()
}

fn csv_metric_values(
    name: String,
    range: &TimeRange,
    raw: &str,
) -> std::result::Result<TimeSeries, String> {
    let values = raw
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| match v {
            "null" => Ok(None),
            _ => v
                .parse::<f64>()
                .map(Some)
                .map_err(|_| format!("invalid metric value {:?}", v)),
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if values.is_empty() {
        return Err("csv_metric_values requires at least one value".to_string());
    }

    let from = range.from_millis();
    let span = i128::from(range.to_millis() - from);
    let last = (values.len() - 1).max(1) as i128;

    let mut series = TimeSeries::new(name);
    series.points = values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            // Offset never exceeds `span`, so it fits back into i64
            let offset = (span * i as i128 / last) as i64;
            TimePoint(value, from + offset)
        })
        .collect();
    Ok(series)
}

/// FNV-1a, stable across builds
fn ref_id_hash(ref_id: &str) -> u64 {
    ref_id.bytes().fold(0xcbf29ce484222325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x100000001b3)
    })
}
