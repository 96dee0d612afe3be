use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A configured backend instance, owned by the external configuration store
#[derive(Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub id: i64,
    pub uid: String,
    pub org_id: i64,
    pub name: String,
    /// Backend type identifier (graphite, prometheus, testdata, etc.)
    #[serde(rename = "type")]
    pub source_type: String,
    /// Endpoint of the backend
    pub url: Option<String>,
    /// Database, index or bucket
    pub database: Option<String>,
    pub user: Option<String>,
    #[serde(default)]
    pub basic_auth: bool,
    /// Backend-specific settings
    #[serde(default)]
    pub json_data: serde_json::Value,
    /// Decrypted secrets (passwords, API keys); never serialized
    #[serde(skip)]
    pub secure_json_data: HashMap<String, String>,
}

impl DataSource {
    pub fn new(source_type: impl Into<String>) -> Self {
        Self {
            id: 0,
            uid: String::new(),
            org_id: 0,
            name: String::new(),
            source_type: source_type.into(),
            url: None,
            database: None,
            user: None,
            basic_auth: false,
            json_data: serde_json::Value::Null,
            secure_json_data: HashMap::new(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn with_org_id(mut self, org_id: i64) -> Self {
        self.org_id = org_id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_basic_auth(mut self, enabled: bool) -> Self {
        self.basic_auth = enabled;
        self
    }

    pub fn with_json_data(mut self, json_data: serde_json::Value) -> Self {
        self.json_data = json_data;
        self
    }

    pub fn with_secure_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.secure_json_data.insert(key.into(), value.into());
        self
    }

    /// Look up a backend-specific setting in `json_data`
    pub fn setting(&self, key: &str) -> Option<&serde_json::Value> {
        self.json_data.get(key)
    }

    /// Target description for logs and error messages (without secrets)
    pub fn display_target(&self) -> String {
        let mut parts = vec![format!("{}://", self.source_type)];

        if let Some(user) = &self.user {
            parts.push(format!("{}@", user));
        }

        if let Some(url) = &self.url {
            parts.push(url.clone());
        }

        if let Some(database) = &self.database {
            parts.push(format!("/{}", database));
        }

        parts.join("")
    }
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secure_keys: Vec<&String> = self.secure_json_data.keys().collect();
        f.debug_struct("DataSource")
            .field("id", &self.id)
            .field("uid", &self.uid)
            .field("org_id", &self.org_id)
            .field("name", &self.name)
            .field("source_type", &self.source_type)
            .field("url", &self.url)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("basic_auth", &self.basic_auth)
            .field("json_data", &self.json_data)
            .field("secure_json_data", &secure_keys)
            .finish()
    }
}

/// Absolute time window of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// The window ending now and spanning `span`
    pub fn last(span: Duration) -> Self {
        let to = Utc::now();
        Self { from: to - span, to }
    }

    pub fn duration(&self) -> Duration {
        self.to - self.from
    }

    pub fn from_millis(&self) -> i64 {
        self.from.timestamp_millis()
    }

    pub fn to_millis(&self) -> i64 {
        self.to.timestamp_millis()
    }
}

/// A single sub-query of a request, identified by its ref id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub ref_id: String,
    /// Backend-specific query body
    #[serde(default)]
    pub model: serde_json::Value,
    #[serde(default)]
    pub max_data_points: i64,
    #[serde(default)]
    pub interval_ms: i64,
    pub query_type: Option<String>,
}

impl Query {
    pub fn new(ref_id: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            model: serde_json::Value::Null,
            max_data_points: 0,
            interval_ms: 0,
            query_type: None,
        }
    }

    pub fn with_model(mut self, model: serde_json::Value) -> Self {
        self.model = model;
        self
    }

    pub fn with_max_data_points(mut self, max_data_points: i64) -> Self {
        self.max_data_points = max_data_points;
        self
    }

    pub fn with_interval_ms(mut self, interval_ms: i64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub fn with_query_type(mut self, query_type: impl Into<String>) -> Self {
        self.query_type = Some(query_type.into());
        self
    }
}

/// Request payload handed to an executor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsdbQuery {
    pub time_range: TimeRange,
    pub queries: Vec<Query>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub debug: bool,
}

impl TsdbQuery {
    pub fn new(time_range: TimeRange) -> Self {
        Self {
            time_range,
            queries: Vec::new(),
            headers: HashMap::new(),
            debug: false,
        }
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.queries.push(query);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn ref_ids(&self) -> Vec<&str> {
        self.queries.iter().map(|q| q.ref_id.as_str()).collect()
    }
}

/// A data point: optional value and a timestamp in epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint(pub Option<f64>, pub i64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub points: Vec<TimePoint>,
}

impl TimeSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeMap::new(),
            points: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Outcome of one sub-query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub ref_id: String,
    #[serde(default)]
    pub series: Vec<TimeSeries>,
    #[serde(default)]
    pub tables: Vec<Table>,
    pub meta: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl QueryResult {
    pub fn ok(ref_id: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            ..Default::default()
        }
    }

    pub fn failed(ref_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_series(mut self, series: TimeSeries) -> Self {
        self.series.push(series);
        self
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Per-sub-query outcomes of a request.
///
/// A response may mix successful and failed sub-queries; only failures that
/// abort the whole request are reported as a top-level `DataError`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TsdbResponse {
    pub results: BTreeMap<String, QueryResult>,
    pub message: Option<String>,
}

impl TsdbResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result keyed by its ref id, replacing any previous one
    pub fn with_result(mut self, result: QueryResult) -> Self {
        self.insert(result);
        self
    }

    pub fn insert(&mut self, result: QueryResult) {
        self.results.insert(result.ref_id.clone(), result);
    }

    pub fn get(&self, ref_id: &str) -> Option<&QueryResult> {
        self.results.get(ref_id)
    }

    /// Ref ids of the sub-queries that failed
    pub fn errors(&self) -> Vec<&str> {
        self.results
            .values()
            .filter(|r| r.is_error())
            .map(|r| r.ref_id.as_str())
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.results.values().any(QueryResult::is_error)
    }

    /// Some sub-queries succeeded while others failed
    pub fn is_partial(&self) -> bool {
        self.has_errors() && self.results.values().any(|r| !r.is_error())
    }
}
