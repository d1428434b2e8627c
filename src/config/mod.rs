//! Server configuration.
//!
//! Settings come from a TOML file whose sections all have defaults; API keys
//! are only ever read from the environment.

mod build;
mod error;
mod load;
mod secrets;
mod types;

pub use build::{build_pipeline, build_registry};
pub use error::ConfigError;
pub use load::{default_config_path, load_config, parse_config};
pub use secrets::Secrets;
pub use types::{
    AppConfig, IndexBackend, JudgeConfig, LoggingConfig, PipelineConfig, ProviderConfig,
    ProvidersConfig, RetrievalConfig, ServerConfig, StorageConfig,
};
