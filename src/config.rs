//! Configuration management for the meal service.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::{Result, ServiceError};
use crate::ratelimit::{KeyPolicy, MAX_BURST, WINDOW};
use crate::store::default_database_path;
use crate::telemetry::ExporterKind;

/// Main configuration for the meal service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Persistence configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Request tracing configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Log output configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Requests admitted per window for one key
    #[serde(default = "default_max_burst")]
    pub max_burst: usize,

    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// How request URIs map to rate limit keys
    #[serde(default)]
    pub key_policy: KeyPolicy,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            max_burst: default_max_burst(),
            window_ms: default_window_ms(),
            key_policy: KeyPolicy::default(),
        }
    }
}

impl RateLimitingConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

fn default_max_burst() -> usize {
    MAX_BURST
}

fn default_window_ms() -> u64 {
    u64::try_from(WINDOW.as_millis()).unwrap_or(u64::MAX)
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Rows loaded into a freshly created table, if the file exists
    #[serde(default = "default_seed_file")]
    pub seed_file: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            seed_file: default_seed_file(),
        }
    }
}

fn default_seed_file() -> PathBuf {
    PathBuf::from("meals.txt")
}

/// Request tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_tracer_name")]
    pub tracer_name: String,

    #[serde(default)]
    pub exporter: ExporterKind,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            tracer_name: default_tracer_name(),
            exporter: ExporterKind::default(),
        }
    }
}

fn default_tracer_name() -> String {
    "rest-tracer".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServiceConfig {
    /// Load configuration from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading service configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ServiceConfig = serde_yaml::from_str(yaml)
            .map_err(|e| ServiceError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the limiter cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limiting.max_burst == 0 {
            return Err(ServiceError::Config(
                "rate_limiting.max_burst must be at least 1".to_string(),
            ));
        }
        if self.rate_limiting.window_ms == 0 {
            return Err(ServiceError::Config(
                "rate_limiting.window_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();

        assert_eq!(config.server.bind_addr.port(), 8080);
        assert_eq!(config.rate_limiting.max_burst, 10);
        assert_eq!(config.rate_limiting.window(), Duration::from_secs(1));
        assert_eq!(config.rate_limiting.key_policy, KeyPolicy::Raw);
        assert_eq!(config.store.seed_file, PathBuf::from("meals.txt"));
        assert!(config.store.database_path.ends_with("database.db3"));
        assert_eq!(config.telemetry.tracer_name, "rest-tracer");
        assert_eq!(config.telemetry.exporter, ExporterKind::Log);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = ServiceConfig::from_yaml("{}").unwrap();
        assert_eq!(config.rate_limiting.max_burst, MAX_BURST);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
server:
  bind_addr: 127.0.0.1:9000
rate_limiting:
  max_burst: 5
  key_policy: path
store:
  database_path: /var/lib/meals/db.db3
telemetry:
  exporter: none
logging:
  format: json
"#;
        let config = ServiceConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.server.bind_addr.port(), 9000);
        assert_eq!(config.rate_limiting.max_burst, 5);
        assert_eq!(config.rate_limiting.window_ms, 1000);
        assert_eq!(config.rate_limiting.key_policy, KeyPolicy::Path);
        assert_eq!(config.store.database_path, PathBuf::from("/var/lib/meals/db.db3"));
        assert_eq!(config.telemetry.exporter, ExporterKind::None);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_zero_burst_rejected() {
        let err = ServiceConfig::from_yaml("rate_limiting:\n  max_burst: 0\n").unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = ServiceConfig::from_yaml("server: [").unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "rate_limiting:\n  window_ms: 250\n").unwrap();

        let config = ServiceConfig::from_file(&path).unwrap();
        assert_eq!(config.rate_limiting.window(), Duration::from_millis(250));
    }
}
