use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const CONFIG_DIR_PREFIX: &str = "ynab-sync";
const STATEMENTS_DIR: &str = "statements";

pub const DEFAULT_YNAB_API_URL: &str = "https://api.ynab.com/v1";
pub const DEFAULT_EXPORTER_COMMAND: &str = "westpac-export";

/// Settings that are not secrets. Credentials always come from flags or the
/// environment, never from this file.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub ynab: YnabConfig,
    pub westpac: WestpacConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct YnabConfig {
    pub api_url: String,
}

impl Default for YnabConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_YNAB_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WestpacConfig {
    pub exporter_command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,
}

impl Default for WestpacConfig {
    fn default() -> Self {
        Self {
            exporter_command: DEFAULT_EXPORTER_COMMAND.to_string(),
            download_dir: None,
        }
    }
}

impl WestpacConfig {
    /// Directory handed to the export helper, falling back to the XDG cache.
    pub fn download_dir(&self) -> Result<PathBuf> {
        match &self.download_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                Ok(dir.clone())
            }
            None => Config::statements_dir(),
        }
    }
}

impl Config {
    /// Load the config file, or defaults when it does not exist.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)?;
        Self::parse(&contents)
    }

    fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        if config.ynab.api_url.is_empty() {
            return Err(AppError::Config(
                "ynab.api_url must not be empty".to_string(),
            ));
        }

        if config.westpac.exporter_command.is_empty() {
            return Err(AppError::Config(
                "westpac.exporter_command must not be empty".to_string(),
            ));
        }

        Ok(config)
    }

    fn xdg_dirs() -> xdg::BaseDirectories {
        xdg::BaseDirectories::with_prefix(CONFIG_DIR_PREFIX)
    }

    /// Get the config file path
    pub fn config_file() -> Result<PathBuf> {
        let xdg_dirs = Self::xdg_dirs();
        xdg_dirs
            .place_config_file("config.toml")
            .map_err(|e| AppError::Config(format!("Failed to create config directory: {}", e)))
    }

    /// Default directory for downloaded statements
    pub fn statements_dir() -> Result<PathBuf> {
        let xdg = Self::xdg_dirs();
        xdg.create_cache_directory(STATEMENTS_DIR)
            .map_err(|e| AppError::Config(format!("Failed to create statements directory: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = Config {
            ynab: YnabConfig {
                api_url: "http://localhost:8080/v1".to_string(),
            },
            westpac: WestpacConfig {
                exporter_command: "/opt/westpac/export".to_string(),
                download_dir: Some(PathBuf::from("/tmp/statements")),
            },
        };

        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.ynab.api_url, DEFAULT_YNAB_API_URL);
        assert_eq!(config.westpac.exporter_command, DEFAULT_EXPORTER_COMMAND);
        assert_eq!(config.westpac.download_dir, None);
    }

    #[test]
    fn test_partial_config() {
        let config = Config::parse("[westpac]\nexporter_command = \"my-exporter\"\n").unwrap();

        assert_eq!(config.ynab.api_url, DEFAULT_YNAB_API_URL);
        assert_eq!(config.westpac.exporter_command, "my-exporter");
    }

    #[test]
    fn test_malformed_config() {
        let err = Config::parse("[ynab\napi_url = 1").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_empty_exporter_command_rejected() {
        let err = Config::parse("[westpac]\nexporter_command = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("exporter_command"));
    }

    #[test]
    fn test_explicit_download_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("statements");
        let westpac = WestpacConfig {
            download_dir: Some(target.clone()),
            ..WestpacConfig::default()
        };

        assert_eq!(westpac.download_dir().unwrap(), target);
        assert!(target.is_dir());
    }
}
