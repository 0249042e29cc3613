/*!
 * Configuration file loading and environment overrides
 */

use crate::error::{RideHubError, Result};
use ridehub_server::ServerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "ridehub.toml";

pub const ENV_DATABASE_URL: &str = "RIDEHUB_DATABASE_URL";
pub const ENV_HOST: &str = "RIDEHUB_HOST";
pub const ENV_PORT: &str = "RIDEHUB_PORT";

/// Top-level `ridehub.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,

    /// Log file path (None = stdout)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| RideHubError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| RideHubError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if given, else `ridehub.toml` if present, else defaults.
    /// Environment overrides are applied on top, then the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot honor
    pub fn validate(&self) -> Result<()> {
        let sink = &self.server.log_sink;
        if sink.requeue_limit > sink.buffer_capacity {
            return Err(RideHubError::Config(format!(
                "log_sink.requeue_limit ({}) must not exceed log_sink.buffer_capacity ({})",
                sink.requeue_limit, sink.buffer_capacity
            )));
        }
        if self.server.database.max_connections == 0 {
            return Err(RideHubError::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply `RIDEHUB_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            self.server.database.url = url;
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port.trim().parse().map_err(|e| {
                RideHubError::Config(format!("{} must be a port number: {}", ENV_PORT, e))
            })?;
        }
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            r#"
[server]
port = 9090

[server.health]
check_interval_secs = 60

[logging]
level = "debug"
"#,
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.health.check_interval_secs, 60);
        assert_eq!(config.server.metrics.rollover_interval_secs, 60);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("ridehub.example.toml");
        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config, AppConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_requeue_limit_above_buffer_capacity_is_rejected() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "[server.log_sink]\nbuffer_capacity = 20\nrequeue_limit = 50\n",
        )
        .unwrap();

        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, RideHubError::Config(_)));
        assert!(err.to_string().contains("requeue_limit"));

        let mut config = AppConfig::default();
        config.server.log_sink.buffer_capacity = 50;
        config.server.log_sink.requeue_limit = 50;
        config.validate().unwrap();
    }

    #[test]
    fn test_zero_pool_size_is_rejected() {
        let mut config = AppConfig::default();
        config.server.database.max_connections = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_connections"));
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[server]\nport = \"eighty\"\n").unwrap();

        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, RideHubError::ConfigParse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::from_file(Path::new("/nonexistent/ridehub.toml")).unwrap_err();
        assert!(matches!(err, RideHubError::ConfigRead { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                (ENV_DATABASE_URL, "mysql://ops@db:3306/ridehub"),
                (ENV_HOST, "0.0.0.0"),
                (ENV_PORT, " 8443 "),
            ]))
            .unwrap();

        assert_eq!(config.server.database.url, "mysql://ops@db:3306/ridehub");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8443);
    }

    #[test]
    fn test_env_rejects_bad_port() {
        let mut config = AppConfig::default();
        let err = config.apply_env(env(&[(ENV_PORT, "http")])).unwrap_err();
        assert!(err.to_string().contains(ENV_PORT));
    }

    #[test]
    fn test_toml_output_reloads() {
        let mut config = AppConfig::default();
        config.server.cors_origins = vec!["https://admin.ridehub.example".to_string()];
        config.logging.level = LogLevel::Warn;

        let rendered = config.to_toml().unwrap();
        let reloaded: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(reloaded, config);
    }
}
