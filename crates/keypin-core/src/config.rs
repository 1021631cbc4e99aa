//! Keypad configuration
//!
//! Loaded from a TOML file supplied by the wiring layer. Every field has a
//! default so a partial file is accepted.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{KeypinError, Result};
use crate::{DEFAULT_MASK_CHAR, DEFAULT_PIN_LENGTH};

/// Configuration directory under ~/.config
const CONFIG_DIR_NAME: &str = "keypin";

/// Configuration file name
const CONFIG_FILE_NAME: &str = "keypin.toml";

/// PIN file name
const PIN_FILE_NAME: &str = "pins.json";

/// Settings for one keypad
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeypadConfig {
    /// Exact number of digits every PIN must have
    #[serde(default = "default_pin_length")]
    pub pin_length: usize,

    /// Master PIN, empty to disable
    #[serde(default)]
    pub backdoor_code: String,

    /// Where the serialized PIN list lives
    #[serde(default = "default_pin_file")]
    pub pin_file: PathBuf,

    /// Character shown per digit while masked
    #[serde(default = "default_mask_char")]
    pub mask_char: char,
}

fn default_pin_length() -> usize {
    DEFAULT_PIN_LENGTH
}

fn default_mask_char() -> char {
    DEFAULT_MASK_CHAR
}

fn default_pin_file() -> PathBuf {
    KeypadConfig::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PIN_FILE_NAME)
}

impl Default for KeypadConfig {
    fn default() -> Self {
        Self {
            pin_length: default_pin_length(),
            backdoor_code: String::new(),
            pin_file: default_pin_file(),
            mask_char: default_mask_char(),
        }
    }
}

impl KeypadConfig {
    /// Config with a given PIN length and backdoor, other fields default
    pub fn new(pin_length: usize, backdoor_code: impl Into<String>) -> Self {
        Self {
            pin_length,
            backdoor_code: backdoor_code.into(),
            ..Default::default()
        }
    }

    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        // Try XDG_CONFIG_HOME first, then fall back to ~/.config
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg_config).join(CONFIG_DIR_NAME));
        }
        dirs::config_dir().map(|p| p.join(CONFIG_DIR_NAME))
    }

    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| KeypinError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save configuration as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| KeypinError::InvalidConfig(e.to_string()))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject settings no keypad could work with
    pub fn validate(&self) -> Result<()> {
        if self.pin_length == 0 {
            return Err(KeypinError::InvalidConfig(
                "pin_length must be at least 1".to_string(),
            ));
        }
        if !self.backdoor_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(KeypinError::InvalidConfig(
                "backdoor_code must contain only digits".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = KeypadConfig::default();
        assert_eq!(config.pin_length, 4);
        assert!(config.backdoor_code.is_empty());
        assert_eq!(config.mask_char, '*');
        assert!(config.pin_file.ends_with("pins.json"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("keypin.toml");
        fs::write(&path, "backdoor_code = \"0000\"\n").unwrap();

        let config = KeypadConfig::load(&path).unwrap();
        assert_eq!(config.pin_length, 4);
        assert_eq!(config.backdoor_code, "0000");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("keypin.toml");
        let mut config = KeypadConfig::new(6, "123456");
        config.pin_file = temp_dir.path().join("door.json");

        config.save(&path).unwrap();
        assert_eq!(KeypadConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = tempdir().unwrap();
        let config = KeypadConfig::load_or_default(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.pin_length, 4);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(KeypadConfig::new(0, "").validate().is_err());
        assert!(KeypadConfig::new(4, "12a4").validate().is_err());
        assert!(KeypadConfig::new(4, "").validate().is_ok());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("keypin.toml");
        fs::write(&path, "pin_length = \"four\"").unwrap();

        assert!(matches!(
            KeypadConfig::load(&path),
            Err(KeypinError::InvalidConfig(_))
        ));
    }
}
