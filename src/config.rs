//! Configuration module for filekeep.

use serde::Deserialize;
use std::path::{Component, Path};

use crate::{FilekeepError, Result};

/// File storage configuration.
///
/// Treated as immutable once handed to [`crate::file::FileStorage`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Root directory that the file directory lives under.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Directory under `base_path` holding all stored files.
    #[serde(default = "default_file_dir")]
    pub file_dir: String,
    /// Public URL prefix the root is served under.
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_base_path() -> String {
    "webroot".to_string()
}

fn default_file_dir() -> String {
    "files".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            file_dir: default_file_dir(),
            base_url: None,
        }
    }
}

impl StorageConfig {
    /// Create a storage configuration rooted at `base_path`.
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Self::default()
        }
    }

    /// Set the file directory.
    pub fn with_file_dir(mut self, file_dir: impl Into<String>) -> Self {
        self.file_dir = file_dir.into();
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Check that `base_path` is set and that `file_dir` is a non-empty
    /// relative path that stays below it.
    pub fn validate(&self) -> Result<()> {
        if self.base_path.trim().is_empty() {
            return Err(FilekeepError::Config("storage.base_path is empty".to_string()));
        }

        if self.file_dir.trim_matches('/').is_empty() {
            return Err(FilekeepError::Config("storage.file_dir is empty".to_string()));
        }

        let escapes = Path::new(&self.file_dir)
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(FilekeepError::Config(format!(
                "storage.file_dir must be a relative path below base_path: {}",
                self.file_dir
            )));
        }

        Ok(())
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/filekeep.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/filekeep.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// File storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FilekeepError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FilekeepError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FILEKEEP_BASE_PATH`
    /// - `FILEKEEP_BASE_URL`
    /// - `FILEKEEP_DATABASE_PATH`
    pub fn apply_env_overrides(&mut self) {
        if let Some(base_path) = non_empty_env("FILEKEEP_BASE_PATH") {
            self.storage.base_path = base_path;
        }
        if let Some(base_url) = non_empty_env("FILEKEEP_BASE_URL") {
            self.storage.base_url = Some(base_url);
        }
        if let Some(db_path) = non_empty_env("FILEKEEP_DATABASE_PATH") {
            self.database.path = db_path;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.storage.validate()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.storage.base_path, "webroot");
        assert_eq!(config.storage.file_dir, "files");
        assert_eq!(config.storage.base_url, None);
        assert_eq!(config.database.path, "data/filekeep.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/filekeep.log");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[storage]
base_path = "/srv/www"
file_dir = "uploads"
base_url = "https://cdn.example.com/"

[database]
path = "custom/meta.db"

[logging]
level = "debug"
file = "custom/logs/app.log"
"#;
        let config = Config::parse(toml).unwrap();

        assert_eq!(config.storage.base_path, "/srv/www");
        assert_eq!(config.storage.file_dir, "uploads");
        assert_eq!(
            config.storage.base_url.as_deref(),
            Some("https://cdn.example.com/")
        );
        assert_eq!(config.database.path, "custom/meta.db");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "custom/logs/app.log");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[storage]
file_dir = "media"
"#;
        let config = Config::parse(toml).unwrap();

        assert_eq!(config.storage.base_path, "webroot");
        assert_eq!(config.storage.file_dir, "media");
        assert_eq!(config.database.path, "data/filekeep.db");
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("[storage\nbase_path = 1");
        assert!(matches!(result, Err(FilekeepError::Config(_))));
    }

    #[test]
    fn test_validate_default_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_file_dir() {
        let mut config = Config::default();
        config.storage.file_dir = "/".to_string();
        assert!(matches!(config.validate(), Err(FilekeepError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_escaping_file_dir() {
        let mut config = Config::default();
        config.storage.file_dir = "../outside".to_string();
        assert!(config.validate().is_err());

        config.storage.file_dir = "/abs/files".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_config_validate() {
        assert!(StorageConfig::new("/srv/www").validate().is_ok());
        assert!(StorageConfig::new("  ").validate().is_err());
        assert!(StorageConfig::new("/srv/www")
            .with_file_dir("a/../../b")
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_accepts_nested_file_dir() {
        let mut config = Config::default();
        config.storage.file_dir = "static/files".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_storage_config_builder() {
        let storage = StorageConfig::new("/tmp/root")
            .with_file_dir("blobs")
            .with_base_url("http://localhost");

        assert_eq!(storage.base_path, "/tmp/root");
        assert_eq!(storage.file_dir, "blobs");
        assert_eq!(storage.base_url.as_deref(), Some("http://localhost"));
    }
}
