//! Configuration loading and typed config structures for the inspector.
//!
//! The configuration lives in `fsm-inspect.yaml`. Every field has a serde
//! default, so an empty or partial file is valid and a missing file means
//! [`InspectorConfig::default`].

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

/// Environment variable overriding [`ListenConfig::host`].
pub const HOST_ENV: &str = "FSM_INSPECT_HOST";

/// Environment variable overriding [`ListenConfig::port`].
pub const PORT_ENV: &str = "FSM_INSPECT_PORT";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level inspector configuration, mirroring `fsm-inspect.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InspectorConfig {
    /// Where the HTTP and `WebSocket` server listens.
    #[serde(default)]
    pub listen: ListenConfig,

    /// Producer ingestion limits.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl InspectorConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `FSM_INSPECT_HOST` and `FSM_INSPECT_PORT` override the listen
    /// address when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    ///
    /// Environment overrides are applied in both cases.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file exists but cannot be loaded.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.listen.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a mapping.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.listen.apply_env_overrides();
        Ok(config)
    }
}

/// Listen address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListenConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ListenConfig {
    /// Override the listen address with environment variables when set.
    ///
    /// An unparsable port is ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(HOST_ENV) {
            self.host = val;
        }
        if let Ok(val) = std::env::var(PORT_ENV) {
            match val.parse() {
                Ok(port) => self.port = port,
                Err(error) => warn!(value = %val, %error, "ignoring invalid {PORT_ENV}"),
            }
        }
    }
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Producer ingestion limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IngestConfig {
    /// Largest accepted `WebSocket` frame from a producer, in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    9002
}

const fn default_max_frame_bytes() -> usize {
    1_048_576
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = InspectorConfig::default();
        assert_eq!(config.listen.host, "0.0.0.0");
        assert_eq!(config.listen.port, 9002);
        assert_eq!(config.ingest.max_frame_bytes, 1_048_576);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
listen:
  host: "127.0.0.1"
  port: 9100

ingest:
  max_frame_bytes: 4096

logging:
  level: "debug"
  json: true
"#;
        let config = InspectorConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.ok().unwrap_or_default();

        // Host and port may be replaced by the environment in CI.
        if std::env::var(HOST_ENV).is_err() {
            assert_eq!(config.listen.host, "127.0.0.1");
        }
        if std::env::var(PORT_ENV).is_err() {
            assert_eq!(config.listen.port, 9100);
        }
        assert_eq!(config.ingest.max_frame_bytes, 4096);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "logging:\n  json: true\n";
        let config = InspectorConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert!(config.logging.json);
        // Everything else uses defaults
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.ingest, IngestConfig::default());
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(InspectorConfig::parse("").is_ok());
        assert!(InspectorConfig::parse("\n  \n").is_ok());
    }

    #[test]
    fn parse_invalid_yaml() {
        let config = InspectorConfig::parse("listen: [unclosed");
        assert!(matches!(config, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("does-not-exist.yaml");
        let config = InspectorConfig::load_or_default(&path);
        assert!(config.is_ok());
        assert!(matches!(
            InspectorConfig::from_file(&path),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("fsm-inspect.yaml");
        if path.exists() {
            let config = InspectorConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
