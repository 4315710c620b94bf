use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::commands::StartMode;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// VMware install directory in Windows form, overriding the registry lookup
    pub install_path: Option<String>,
    /// Guest account used to tell paused from started
    pub guest_user: String,
    /// Password for `guest_user`
    pub guest_password: String,
    /// How `power ... started` launches a VM unless told otherwise
    pub default_start_mode: StartMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            install_path: None,
            guest_user: "guest".to_string(),
            guest_password: "guest".to_string(),
            default_start_mode: StartMode::Nogui,
        }
    }
}

/// Shown in place of a configured guest password
pub const REDACTED_PASSWORD: &str = "********";

impl Config {
    /// Copy safe to print; a non-empty guest password is masked
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.guest_password.is_empty() {
            config.guest_password = REDACTED_PASSWORD.to_string();
        }
        config
    }

    /// Load configuration from file or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file, which must exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", config_path))
    }

    /// Save configuration to file
    pub fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config to {:?}", config_path))?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_file_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("vmware-wpro")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("guest_user = \"admin\"\n").unwrap();
        assert_eq!(config.guest_user, "admin");
        assert_eq!(config.guest_password, "guest");
        assert_eq!(config.default_start_mode, StartMode::Nogui);
        assert!(config.install_path.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            install_path: Some(r"D:\VMware\".to_string()),
            default_start_mode: StartMode::Gui,
            ..Config::default()
        };

        config.save(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_invalid_toml_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_start_mode = \"sideways\"\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_redacted_masks_guest_password() {
        let config = Config {
            guest_password: "hunter2".to_string(),
            ..Config::default()
        };
        let shown = config.redacted();
        assert_eq!(shown.guest_password, REDACTED_PASSWORD);
        assert_eq!(shown.guest_user, config.guest_user);
        assert_eq!(config.guest_password, "hunter2");

        let json = serde_json::to_string(&shown).unwrap();
        assert!(!json.contains("hunter2"));

        let empty = Config {
            guest_password: String::new(),
            ..Config::default()
        };
        assert_eq!(empty.redacted().guest_password, "");
    }
}
