use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result, anyhow};

use crate::store::DEFAULT_TITLE;

pub const DEFAULT_REPLY_DELAY_MS: u64 = 1000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub default_title: Option<String>,
    pub reply_delay_ms: Option<u64>,
    pub show_sidebar: Option<bool>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            default_title: Some(DEFAULT_TITLE.to_string()),
            reply_delay_ms: Some(DEFAULT_REPLY_DELAY_MS),
            show_sidebar: Some(true),
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    /// Load from the default location, or defaults if no file exists yet
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("cognichat").join("config.json"))
    }

    pub fn default_title(&self) -> &str {
        self.default_title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_TITLE)
    }

    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms.unwrap_or(DEFAULT_REPLY_DELAY_MS))
    }

    pub fn show_sidebar(&self) -> bool {
        self.show_sidebar.unwrap_or(true)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.default_title(), DEFAULT_TITLE);
        assert_eq!(config.reply_delay(), Duration::from_millis(1000));
        assert!(config.show_sidebar());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            default_title: Some("New chat".to_string()),
            reply_delay_ms: Some(250),
            show_sidebar: Some(false),
            log_level: Some("debug".to_string()),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.default_title(), "New chat");
        assert_eq!(loaded.reply_delay(), Duration::from_millis(250));
        assert!(!loaded.show_sidebar());
        assert_eq!(loaded.log_level(), "debug");
    }

    #[test]
    fn test_partial_file_falls_back_per_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "reply_delay_ms": 5 }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.reply_delay(), Duration::from_millis(5));
        assert_eq!(config.default_title(), DEFAULT_TITLE);
        assert!(config.show_sidebar());
        assert_eq!(config.log_level(), DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_blank_title_uses_default() {
        let config = Config {
            default_title: Some("  ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.default_title(), DEFAULT_TITLE);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
