//! Configuration management for the fraud classifier service

use crate::types::details::ModelDetails;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Prefix of environment variable overrides, e.g. `FRAUD_SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "FRAUD";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub details: ModelDetails,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Number of HTTP workers (0 = one per CPU)
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            workers: 0,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model name used in logs
    pub name: String,
    /// Path of the ONNX classifier
    pub path: PathBuf,
    /// Optional `{"feature_names": [...]}` file overriding the embedded ordering
    pub feature_info_path: Option<PathBuf>,
    /// Number of threads for ONNX inference (default: 1)
    pub onnx_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "random_forest".to_string(),
            path: PathBuf::from("model/random_forest_model.onnx"),
            feature_info_path: None,
            onnx_threads: 1,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive used when RUST_LOG is unset
    pub level: String,
    /// Log format (json, pretty)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Service metrics configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between logged summaries (0 disables periodic reports)
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file and environment
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path.
    ///
    /// The file is optional; `FRAUD_`-prefixed environment variables are
    /// layered on top, with `__` separating sections.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_env(path.as_ref(), environment())
    }

    fn load_with_env(path: &Path, env: Environment) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(env)
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

/// Environment overrides. Values stay strings so that text settings such as
/// `FRAUD_DETAILS__VERSION=1.0` survive verbatim; numeric fields are
/// converted during deserialization.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn toml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_address(), "127.0.0.1:5000");
        assert_eq!(config.model.path, PathBuf::from("model/random_forest_model.onnx"));
        assert_eq!(config.model.onnx_threads, 1);
        assert!(config.model.feature_info_path.is_none());
        assert_eq!(config.details.algorithm, "Random Forest");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = AppConfig::load_from_path("does/not/exist.toml").unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.details.version, "1.0");
    }

    #[test]
    fn test_partial_file_overrides() {
        let file = toml_file(
            r#"
            [server]
            port = 8080

            [model]
            path = "artifacts/rf.onnx"
            feature_info_path = "artifacts/feature_info.json"

            [details]
            version = "1.1"

            [details.metrics]
            accuracy = 0.5
            roc-auc = 0.6
            precision = 0.7
            recall = 0.8
            f1-score = 0.9

            [logging]
            format = "json"
            "#,
        );

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.model.path, PathBuf::from("artifacts/rf.onnx"));
        assert_eq!(
            config.model.feature_info_path,
            Some(PathBuf::from("artifacts/feature_info.json"))
        );
        assert_eq!(config.details.version, "1.1");
        assert_eq!(config.details.algorithm, "Random Forest");
        assert_eq!(config.details.metrics.roc_auc, 0.6);
        assert_eq!(config.details.metrics.f1_score, 0.9);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_overrides_keep_string_values() {
        let vars: config::Map<String, String> = [
            ("FRAUD_DETAILS__VERSION", "1.0"),
            ("FRAUD_SERVER__PORT", "8080"),
            ("FRAUD_MODEL__ONNX_THREADS", "4"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let env = environment().source(Some(vars));
        let config = AppConfig::load_with_env(Path::new("does/not/exist.toml"), env).unwrap();
        assert_eq!(config.details.version, "1.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.model.onnx_threads, 4);
    }
}
