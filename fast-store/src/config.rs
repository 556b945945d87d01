//! Configuration loading for fast-store.
//!
//! Configuration is loaded from a TOML file (default: `fast-store.toml`).
//! Every section and field is optional.

use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration for fast-store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Request handling configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Rate limiting configuration.
    pub limits: LimitsConfig,
    /// HTTP endpoints configuration.
    pub http: HttpConfig,
    /// Background progress task configuration.
    pub progress: ProgressConfig,
    /// Content override configuration.
    pub content: ContentConfig,
}

/// Request handling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Maximum request body size in bytes (default: 64KB).
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
    /// Maximum reflection length in bytes (default: 16KB).
    #[serde(default = "default_max_reflection_len")]
    pub max_reflection_len: usize,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum requests per user per minute (default: 120).
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Maximum requests per second across all users (default: 1000).
    #[serde(default = "default_global_requests_per_second")]
    pub global_requests_per_second: u32,
}

/// HTTP endpoints configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Bind address for HTTP server (default: 0.0.0.0:8080).
    #[serde(default = "default_http_bind")]
    pub bind_address: String,
    /// Enable metrics endpoint (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

/// Background progress task configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressConfig {
    /// Recompute interval in seconds (default: 60).
    #[serde(default = "default_progress_interval")]
    pub interval_secs: u64,
    /// Enable progress task (default: true).
    #[serde(default = "default_progress_enabled")]
    pub enabled: bool,
}

/// Content override configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentConfig {
    /// TOML file replacing the built-in fasting content.
    pub path: Option<PathBuf>,
}

// Default value functions
fn default_max_request_bytes() -> usize {
    64 * 1024 // 64KB
}

fn default_max_reflection_len() -> usize {
    16 * 1024 // 16KB
}

fn default_database_path() -> PathBuf {
    PathBuf::from("fast-store.db")
}

fn default_requests_per_minute() -> u32 {
    120
}

fn default_global_requests_per_second() -> u32 {
    1000
}

fn default_http_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_progress_interval() -> u64 {
    60
}

fn default_progress_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_request_bytes: default_max_request_bytes(),
            max_reflection_len: default_max_reflection_len(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database_path(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            global_requests_per_second: default_global_requests_per_second(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: default_http_bind(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_progress_interval(),
            enabled: default_progress_enabled(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.http.bind_address, "0.0.0.0:8080");
        assert_eq!(config.limits.requests_per_minute, 120);
        assert_eq!(config.progress.interval_secs, 60);
        assert!(config.content.path.is_none());
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[server]
max_reflection_len = 2048

[storage]
database = "/data/unplugged.db"

[limits]
requests_per_minute = 30

[http]
bind_address = "127.0.0.1:9090"
metrics_enabled = false

[progress]
interval_secs = 300

[content]
path = "/etc/unplugged/content.toml"
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.max_reflection_len, 2048);
        assert_eq!(config.storage.database, PathBuf::from("/data/unplugged.db"));
        assert_eq!(config.limits.requests_per_minute, 30);
        assert_eq!(config.http.bind_address, "127.0.0.1:9090");
        assert!(!config.http.metrics_enabled);
        assert_eq!(config.progress.interval_secs, 300);
        assert_eq!(
            config.content.path,
            Some(PathBuf::from("/etc/unplugged/content.toml"))
        );
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.max_request_bytes, 64 * 1024);
        assert_eq!(config.limits.global_requests_per_second, 1000);
        assert!(config.progress.enabled);
    }

    #[test]
    fn config_missing_fields_use_defaults() {
        let toml = r#"
[limits]
global_requests_per_second = 50
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.limits.global_requests_per_second, 50);
        assert_eq!(config.limits.requests_per_minute, 120);
    }

    #[test]
    fn from_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[limits]\nrequests_per_minute = \"lots\"").unwrap();

        let result = Config::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn from_file_reports_missing_file() {
        let result = Config::from_file(std::path::Path::new("/nonexistent/fast-store.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}
