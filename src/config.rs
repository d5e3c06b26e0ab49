//! Configuration management for Slidegate.
//!
//! Configuration is layered: built-in defaults, then an optional YAML file,
//! then `SLIDEGATE__`-prefixed environment variables
//! (e.g. `SLIDEGATE__RATE_LIMITING__MAX_REQUESTS=50`).

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;

use crate::error::{Result, SlidegateError};

/// Environment variable prefix for configuration overrides.
const ENV_PREFIX: &str = "SLIDEGATE";

/// Main configuration for the Slidegate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlidegateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Rate limiting configuration.
///
/// Values are validated when the limiter is built, not when they are parsed,
/// so a zero here surfaces as a configuration error at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Maximum accepted requests per client inside one window
    #[serde(default = "default_max_requests")]
    pub max_requests: u64,

    /// Length of the sliding window in seconds
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,

    /// Interval for the idle-client sweeper; disabled when absent
    #[serde(default)]
    pub sweep_interval_secs: Option<u64>,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_seconds: default_window_seconds(),
            sweep_interval_secs: None,
        }
    }
}

fn default_max_requests() -> u64 {
    100
}

fn default_window_seconds() -> u64 {
    60
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
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

impl SlidegateConfig {
    /// Load configuration from a YAML file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| SlidegateError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load layered configuration: defaults, then the optional file, then
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?.try_deserialize()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SlidegateConfig::default();
        assert_eq!(config.rate_limiting.max_requests, 100);
        assert_eq!(config.rate_limiting.window_seconds, 60);
        assert_eq!(config.rate_limiting.sweep_interval_secs, None);
        assert_eq!(config.server.http_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
rate_limiting:
  max_requests: 5
"#;
        let config = SlidegateConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.rate_limiting.max_requests, 5);
        assert_eq!(config.rate_limiting.window_seconds, 60);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
server:
  http_addr: "0.0.0.0:9000"
rate_limiting:
  max_requests: 10
  window_seconds: 30
  sweep_interval_secs: 120
logging:
  level: debug
  format: json
"#;
        let config = SlidegateConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.http_addr.port(), 9000);
        assert_eq!(config.rate_limiting.window_seconds, 30);
        assert_eq!(config.rate_limiting.sweep_interval_secs, Some(120));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = SlidegateConfig::from_yaml("rate_limiting: [not, a, map]");
        assert!(matches!(result, Err(SlidegateError::Config(_))));
    }

    #[test]
    fn test_load_layers_file_over_defaults() {
        let path = std::env::temp_dir().join(format!(
            "slidegate-config-{}.yaml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "rate_limiting:\n  max_requests: 7\n  window_seconds: 15\n",
        )
        .unwrap();

        let config = SlidegateConfig::load(Some(path.as_path())).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.rate_limiting.max_requests, 7);
        assert_eq!(config.rate_limiting.window_seconds, 15);
        assert_eq!(config.server.http_addr.port(), 8080);
    }

    #[test]
    fn test_from_file_missing_is_io_error() {
        let result = SlidegateConfig::from_file("/nonexistent/slidegate.yaml");
        assert!(matches!(result, Err(SlidegateError::Io(_))));
    }
}
