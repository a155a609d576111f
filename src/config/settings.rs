//! TOML-based configuration for Quarry.
//!
//! Supports a config file (quarry.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [storage]
//! local_path = "${HOME}/.quarry/preferences.db"
//!
//! [backup]
//! enabled = true
//! directory = "/mnt/shared/quarry-backup"
//!
//! [execution]
//! page_size = 10
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::executor::DEFAULT_PAGE_SIZE;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Failed to determine home directory")]
    NoHomeDir,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub storage: StorageSettings,
    pub backup: BackupSettings,
    pub execution: ExecutionSettings,
}

/// Local preference store configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite database path (supports ${ENV_VAR} expansion).
    pub local_path: Option<String>,
}

impl StorageSettings {
    /// The configured path, or `~/.quarry/preferences.db`.
    pub fn resolved_local_path(&self) -> Result<PathBuf, SettingsError> {
        match &self.local_path {
            Some(path) => Ok(PathBuf::from(expand_env_vars(path)?)),
            None => Ok(quarry_home()?.join("preferences.db")),
        }
    }
}

/// Remote backup configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BackupSettings {
    pub enabled: bool,

    /// Backup directory (supports ${ENV_VAR} expansion).
    pub directory: Option<String>,
}

impl BackupSettings {
    /// Backup directory when enabled; defaults to `~/.quarry/backup`.
    pub fn resolved_directory(&self) -> Result<Option<PathBuf>, SettingsError> {
        if !self.enabled {
            return Ok(None);
        }
        match &self.directory {
            Some(dir) => Ok(Some(PathBuf::from(expand_env_vars(dir)?))),
            None => Ok(Some(quarry_home()?.join("backup"))),
        }
    }
}

/// Query execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Rows per result page.
    pub page_size: usize,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn quarry_home() -> Result<PathBuf, SettingsError> {
    let home = dirs::home_dir().ok_or(SettingsError::NoHomeDir)?;
    Ok(home.join(".quarry"))
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load the first config file found by [`Settings::candidates`], or
    /// defaults when none exists.
    ///
    /// `QUARRY_CONFIG` must name an existing file when set.
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("QUARRY_CONFIG") {
            return Self::from_file(path);
        }
        match Self::candidates().into_iter().find(|p| p.is_file()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading settings");
                Self::from_file(path)
            }
            None => Ok(Settings::default()),
        }
    }

    /// Config locations searched by [`Settings::load`]: `./quarry.toml`,
    /// then `<config dir>/quarry/config.toml`.
    pub fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("quarry.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("quarry").join("config.toml"));
        }
        paths
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.execution.page_size == 0 {
            return Err(SettingsError::InvalidConfig(
                "execution.page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. A lone `$` is kept.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.next_if_eq(&'{').is_some() {
            chars.by_ref().take_while(|&ch| ch != '}').collect()
        } else {
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                name.push(ch);
            }
            if name.is_empty() {
                result.push('$');
                continue;
            }
            name
        };

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
