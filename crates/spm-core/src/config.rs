//! Monitor configuration
//!
//! Stored as JSON (`config.json`). Every field has a default, so a partial
//! file, or no file at all, yields a usable configuration.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::SessionConfig;
use crate::transport::SerialSettings;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not valid config JSON
    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    /// A setting is out of range
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Complete monitor configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Serial line settings
    pub serial: SerialSettings,

    /// Read loop settings
    pub session: SessionConfig,
}

impl MonitorConfig {
    /// Default location of the config file
    pub fn default_path() -> io::Result<PathBuf> {
        let base = dirs::config_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "Could not find config directory")
            })?;
        Ok(base.join("spm").join("config.json"))
    }

    /// Parse from a JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load from a file, falling back to defaults if it does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save to a file, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        self.validate()?;
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud_rate must be non-zero".to_string()));
        }
        if !(5..=8).contains(&self.serial.data_bits) {
            return Err(ConfigError::Invalid(format!(
                "data_bits must be 5-8, got {}",
                self.serial.data_bits
            )));
        }
        if !matches!(self.serial.stop_bits, 1 | 2) {
            return Err(ConfigError::Invalid(format!(
                "stop_bits must be 1 or 2, got {}",
                self.serial.stop_bits
            )));
        }
        if self.session.max_line_length < 2 {
            return Err(ConfigError::Invalid(format!(
                "max_line_length must be at least 2, got {}",
                self.session.max_line_length
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let config = MonitorConfig::from_json("{}").expect("parses");
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_partial_serial_section() {
        let config = MonitorConfig::from_json(r#"{"serial":{"port_name":"COM4","baud_rate":9600}}"#)
            .expect("parses");
        assert_eq!(config.serial.port_name.as_deref(), Some("COM4"));
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.data_bits, 8);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = MonitorConfig::default();
        config.serial.stop_bits = 3;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = MonitorConfig::default();
        config.session.max_line_length = 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_default_path_file_name() {
        if let Ok(path) = MonitorConfig::default_path() {
            assert!(path.ends_with("spm/config.json"));
        }
    }
}
