use std::path::PathBuf;

use serde::Deserialize;

use crate::evaluator::DEFAULT_JUDGE_MODEL;
use crate::resilient::ResilienceConfig;

const DEFAULT_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_DEADLINE_SECONDS: u64 = 50;
const DEFAULT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub judge: JudgeConfig,
    pub retrieval: RetrievalConfig,
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    /// Allowed CORS origins; empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            cors_origins: Vec::new(),
        }
    }
}

/// One streaming backend. Unset fields fall back to the backend's defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub enabled: bool,
    /// Model id, also used as the provider id in requests
    pub model: Option<String>,
    /// Name stored as `modelProvider` in metrics
    pub display_name: Option<String>,
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: None,
            display_name: None,
            base_url: None,
            timeout_seconds: None,
            max_tokens: None,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub groq: ProviderConfig,
    pub openai: ProviderConfig,
    pub google: ProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    pub model: String,
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub retry: ResilienceConfig,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_JUDGE_MODEL.to_string(),
            base_url: None,
            timeout_seconds: Some(60),
            retry: ResilienceConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    #[default]
    Memory,
    Pinecone,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub backend: IndexBackend,
    pub embedding_model: String,
    pub pinecone_host: Option<String>,
    pub namespace: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Memory,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            pinecone_host: None,
            namespace: None,
            timeout_seconds: Some(30),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub deadline_seconds: u64,
    /// Fragments buffered between the fan-out and the response writer
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            deadline_seconds: DEFAULT_DEADLINE_SECONDS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON Lines file for metrics; in-memory when unset
    pub metrics_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
