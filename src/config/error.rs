use std::io;

use crate::error::LLMError;
use crate::metrics::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config IO error: {0}")]
    Io(#[from] io::Error),
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("missing home directory for config paths")]
    MissingHome,
    #[error("missing environment variable {0}")]
    MissingSecret(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("backend setup failed: {0}")]
    Backend(#[from] LLMError),
    #[error("metrics store setup failed: {0}")]
    Store(#[from] StoreError),
}
