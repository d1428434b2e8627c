use std::fs;
use std::path::{Path, PathBuf};

use super::error::ConfigError;
use super::types::AppConfig;

/// `~/.config/llm-evaluator/config.toml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::MissingHome)?;
    Ok(home.join(".config").join("llm-evaluator").join("config.toml"))
}

/// Loads the config file, falling back to defaults when it does not exist.
pub fn load_config(path_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let path = match path_override {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };
    match fs::read_to_string(&path) {
        Ok(contents) => {
            log::debug!("Loaded config from {}", path.display());
            parse_config(&contents)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(AppConfig::default())
        }
        Err(err) => Err(ConfigError::Io(err)),
    }
}

pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    Ok(toml::from_str(contents)?)
}
