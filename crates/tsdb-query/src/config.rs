//! Configuration management for the query service

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_PREFIX: &str = "TSDB";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TsdbConfig {
    /// Backend types removed from the static registry at startup
    pub disabled_backends: Vec<String>,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for TsdbConfig {
    fn default() -> Self {
        Self {
            disabled_backends: Vec::new(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl TsdbConfig {
    /// Load from environment variables (`TSDB_DISABLED_BACKENDS=a,b`, `TSDB_LOG_FILTER`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder(None).build()?.try_deserialize()
    }

    /// Load from a config file, with environment variables taking precedence
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::builder(Some(path.as_ref())).build()?.try_deserialize()
    }

    fn builder(path: Option<&Path>) -> config::ConfigBuilder<config::builder::DefaultState> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("disabled_backends"),
        )
    }

    pub fn is_disabled(&self, backend: &str) -> bool {
        self.disabled_backends.iter().any(|b| b == backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const ENV_KEYS: [&str; 2] = ["TSDB_DISABLED_BACKENDS", "TSDB_LOG_FILTER"];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_defaults() {
        let config = TsdbConfig::default();
        assert!(config.disabled_backends.is_empty());
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        clear_env();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "disabled_backends = [\"opentsdb\", \"mssql\"]\nlog_filter = \"debug\""
        )
        .unwrap();

        let config = TsdbConfig::load(file.path()).unwrap();
        assert_eq!(config.disabled_backends, vec!["opentsdb", "mssql"]);
        assert_eq!(config.log_filter, "debug");
        assert!(config.is_disabled("mssql"));
        assert!(!config.is_disabled("MSSQL"));
    }

    #[test]
    #[serial]
    fn test_missing_file_uses_defaults() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let config = TsdbConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert!(config.disabled_backends.is_empty());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        std::env::set_var("TSDB_DISABLED_BACKENDS", "opentsdb,mssql");
        std::env::set_var("TSDB_LOG_FILTER", "debug");

        let config = TsdbConfig::from_env();
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.disabled_backends, vec!["opentsdb", "mssql"]);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        clear_env();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "log_filter = \"warn\"").unwrap();
        std::env::set_var("TSDB_LOG_FILTER", "trace");

        let config = TsdbConfig::load(file.path());
        clear_env();

        assert_eq!(config.unwrap().log_filter, "trace");
    }
}
