//src/config.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
use thiserror::Error;
use tracing::warn;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_CONFIG_DIR: &str = "gymtrack";
pub const CONFIG_ENV_VAR: &str = "GYMTRACK_CONFIG_DIR";
pub const DEFAULT_HISTORY_LIMIT: u32 = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine configuration directory.")]
    CannotDetermineConfigDir,
    #[error("I/O error accessing config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file (TOML): {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize config data (TOML): {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Invalid theme: {0} (expected dark or light)")]
    InvalidTheme(String),
    #[error("History limit must be at least 1.")]
    InvalidHistoryLimit,
}

/// The persisted appearance flag, stored under the `theme` key.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
        }
    }
}

pub fn parse_theme(value: &str) -> Result<ThemeMode, ConfigError> {
    ThemeMode::iter()
        .find(|mode| mode.to_string().eq_ignore_ascii_case(value.trim()))
        .ok_or_else(|| ConfigError::InvalidTheme(value.to_string()))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub theme: ThemeMode,
    /// Prior sessions shown per exercise while working out.
    pub history_limit: u32,
    // Last signed-in session, restored at startup.
    pub user_id: Option<String>,
    pub email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: ThemeMode::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            user_id: None,
            email: None,
        }
    }
}

/// Determines the path to the configuration file, honouring
/// `GYMTRACK_CONFIG_DIR` when set.
pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir_path = match std::env::var(CONFIG_ENV_VAR).ok() {
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if !path.is_dir() {
                warn!(
                    var = CONFIG_ENV_VAR,
                    path = %path.display(),
                    "config override is not a directory, creating it"
                );
            }
            path
        }
        None => dirs::config_dir()
            .ok_or(ConfigError::CannotDetermineConfigDir)?
            .join(APP_CONFIG_DIR),
    };

    if !config_dir_path.exists() {
        fs::create_dir_all(&config_dir_path)?;
    }

    Ok(config_dir_path.join(CONFIG_FILE_NAME))
}

/// Loads the configuration, writing the defaults first if the file is missing.
pub fn load_config(config_path: &Path) -> Result<Config, ConfigError> {
    if !config_path.exists() {
        let default_config = Config::default();
        save_config(config_path, &default_config)?;
        return Ok(default_config);
    }
    let config_content = fs::read_to_string(config_path)?;
    let mut config: Config = toml::from_str(&config_content)?;
    if config.history_limit == 0 {
        warn!("history_limit of 0 in config, using {DEFAULT_HISTORY_LIMIT}");
        config.history_limit = DEFAULT_HISTORY_LIMIT;
    }
    Ok(config)
}

pub fn save_config(config_path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent_dir) = config_path.parent() {
        if !parent_dir.exists() {
            fs::create_dir_all(parent_dir)?;
        }
    }
    let config_content = toml::to_string_pretty(config)?;
    fs::write(config_path, config_content)?;
    Ok(())
}
