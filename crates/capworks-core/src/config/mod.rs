//! Engine configuration parsing and validation.
//!
//! Deployments configure the engine through a small TOML file. Unset fields
//! fall back to defaults; invalid combinations fail closed at parse time
//! rather than at the first transition that would hit them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Serial number settings.
    #[serde(default)]
    pub serial: SerialConfig,

    /// Persistence settings.
    #[serde(default)]
    pub store: StoreConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if
    /// validation fails.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid, the serial prefix is empty,
    /// or the retry bound is zero.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.prefix.is_empty() {
            return Err(ConfigError::Validation(
                "serial.prefix must not be empty".to_string(),
            ));
        }
        if self
            .serial
            .prefix
            .chars()
            .any(|c| c.is_ascii_digit() || c == '-')
        {
            return Err(ConfigError::Validation(format!(
                "serial.prefix '{}' must not contain digits or '-': the year and \
                 sequence components would become ambiguous",
                self.serial.prefix
            )));
        }
        if self.store.max_update_retries == 0 {
            return Err(ConfigError::Validation(
                "store.max_update_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Serial number configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerialConfig {
    /// Prefix of every serial number.
    #[serde(default = "default_serial_prefix")]
    pub prefix: String,

    /// Minimum digit count of the sequence component.
    #[serde(default = "default_serial_pad_width")]
    pub pad_width: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            prefix: default_serial_prefix(),
            pad_width: default_serial_pad_width(),
        }
    }
}

fn default_serial_prefix() -> String {
    "CW".to_string()
}

const fn default_serial_pad_width() -> usize {
    4
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Database path; `None` selects an in-memory store.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Bounded retries for optimistic version conflicts.
    #[serde(default = "default_max_update_retries")]
    pub max_update_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            max_update_retries: default_max_update_retries(),
        }
    }
}

const fn default_max_update_retries() -> u32 {
    8
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config.serial.prefix, "CW");
        assert_eq!(config.serial.pad_width, 4);
        assert_eq!(config.store.db_path, None);
        assert_eq!(config.store.max_update_retries, 8);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [serial]
            prefix = "PW"
            pad_width = 5

            [store]
            db_path = "/var/lib/capworks/proposals.db"
            max_update_retries = 3
        "#;

        let config = EngineConfig::from_toml(toml).unwrap();
        assert_eq!(config.serial.prefix, "PW");
        assert_eq!(config.serial.pad_width, 5);
        assert_eq!(
            config.store.db_path,
            Some(PathBuf::from("/var/lib/capworks/proposals.db"))
        );
        assert_eq!(config.store.max_update_retries, 3);
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let result = EngineConfig::from_toml("[serial]\nprefix = \"\"\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_digit_prefix_rejected() {
        let result = EngineConfig::from_toml("[serial]\nprefix = \"CW9\"\n");
        let err = result.unwrap_err();
        match err {
            ConfigError::Validation(msg) => assert!(msg.contains("ambiguous"), "{msg}"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_retries_rejected() {
        let result = EngineConfig::from_toml("[store]\nmax_update_retries = 0\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = EngineConfig::default();
        let toml = config.to_toml().unwrap();
        let back = EngineConfig::from_toml(&toml).unwrap();
        assert_eq!(back, config);
    }
}
