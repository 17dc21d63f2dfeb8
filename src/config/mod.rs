//! Exporter configuration.
//!
//! The device host comes from the `IP_WIFI_SWITCH` environment variable
//! (optionally seeded from a `.env` file). Everything else has a default
//! and may be overridden from a TOML file. The poll interval is fixed and
//! deliberately absent here.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the device host or IP.
pub const HOST_ENV_VAR: &str = "IP_WIFI_SWITCH";

/// Default config file name, read only if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "power-exporter.toml";

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// The host variable is absent or empty.
    #[error("IP_WIFI_SWITCH is not set")]
    MissingHost,
    /// The host carries a scheme, path or whitespace.
    #[error("invalid device host {0:?} (expected host or host:port)")]
    InvalidHost(String),
    /// A zero request timeout.
    #[error("invalid device timeout (must be at least 1 second)")]
    InvalidTimeout,
    /// A config or `.env` file exists but could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// How to reach the device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Host or IP, optionally with `:port`. Filled from the environment.
    #[serde(skip_serializing)]
    pub host: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            timeout_secs: 5,
        }
    }
}

impl DeviceConfig {
    /// Per-request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// URL of the device's status document.
    pub fn report_url(&self) -> String {
        format!("http://{}/report", self.host)
    }

    /// Validates the device parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if host.contains("://") || host.contains('/') || host.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidHost(self.host.clone()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }
}

/// Metrics listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port for the `/metrics` endpoint.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 5000 }
    }
}

impl ServerConfig {
    /// Listen address on all interfaces.
    pub fn bind_addr(&self) -> SocketAddr {
        ([0, 0, 0, 0], self.port).into()
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExporterConfig {
    /// `[device]` table.
    #[serde(default)]
    pub device: DeviceConfig,
    /// `[server]` table.
    #[serde(default)]
    pub server: ServerConfig,
}

impl ExporterConfig {
    /// Parses a TOML document. The device host is not taken from the file.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: ExporterConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.device.host.clear();
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Builds the startup configuration.
    ///
    /// `path` is read if given explicitly (a missing explicit file is an
    /// error) or if the default file exists. `host` is the value of
    /// [`HOST_ENV_VAR`], if any.
    pub fn load(path: Option<&Path>, host: Option<String>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };

        config.device.host = host.map(|h| h.trim().to_string()).unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Loads `.env` if present, then reads the host from the process environment.
    pub fn from_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(file) => tracing::debug!(path = %file.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(ConfigError::FileReadError(e.to_string())),
        }

        Self::load(path, std::env::var(HOST_ENV_VAR).ok())
    }

    /// Validates the merged configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.device.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExporterConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.device.timeout_secs, 5);
        assert_eq!(config.server.bind_addr().port(), 5000);
    }

    #[test]
    fn test_missing_host_is_fatal() {
        let result = ExporterConfig::load(None, None);
        assert!(matches!(result, Err(ConfigError::MissingHost)));

        let result = ExporterConfig::load(None, Some("   ".to_string()));
        assert!(matches!(result, Err(ConfigError::MissingHost)));
    }

    #[test]
    fn test_host_from_env_value() {
        let config = ExporterConfig::load(None, Some(" 10.0.0.7 ".to_string())).unwrap();
        assert_eq!(config.device.host, "10.0.0.7");
        assert_eq!(config.device.report_url(), "http://10.0.0.7/report");
    }

    #[test]
    fn test_host_with_scheme_rejected() {
        let result = ExporterConfig::load(None, Some("http://10.0.0.7".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidHost(_))));
    }

    #[test]
    fn test_toml_overrides() {
        let config = ExporterConfig::from_toml(
            r#"
            [device]
            timeout_secs = 2
            host = "ignored"

            [server]
            port = 9101
            "#,
        )
        .unwrap();
        assert_eq!(config.device.timeout_secs, 2);
        assert!(config.device.host.is_empty());
        assert_eq!(config.server.port, 9101);
    }

    #[test]
    fn test_partial_tables_keep_defaults() {
        let config = ExporterConfig::from_toml("[device]\n[server]\n").unwrap();
        assert_eq!(config.device.timeout_secs, 5);
        assert_eq!(config.server.port, 5000);

        let config = ExporterConfig::from_toml("[device]\nhost = \"x\"\n").unwrap();
        assert_eq!(config.device.timeout_secs, 5);
    }

    #[test]
    fn test_zero_timeout_invalid() {
        let mut config = ExporterConfig::default();
        config.device.host = "switch.local".to_string();
        config.device.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTimeout)));
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = ExporterConfig::load(
            Some(Path::new("/nonexistent/power-exporter.toml")),
            Some("10.0.0.7".to_string()),
        );
        assert!(matches!(result, Err(ConfigError::FileReadError(_))));
    }

    #[test]
    fn test_malformed_file() {
        assert!(matches!(
            ExporterConfig::from_toml("[server]\nport = \"high\""),
            Err(ConfigError::ParseError(_))
        ));
    }
}
