use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::evaluator::Judge;
use crate::fanout::FanOut;
use crate::metrics::{InMemoryMetricsStore, JsonlMetricsStore, MetricsSink, MetricsStore};
use crate::pipeline::Pipeline;
use crate::registry::ProviderRegistry;

use super::error::ConfigError;
use super::secrets::Secrets;
use super::types::{AppConfig, ProviderConfig};

/// Registers every enabled backend that has an API key.
///
/// Backends without a key are skipped with a warning rather than failing
/// startup, so a server can run with any subset of providers.
pub fn build_registry(config: &AppConfig, secrets: &Secrets) -> Result<ProviderRegistry, ConfigError> {
    let mut registry = ProviderRegistry::new();
    register_groq(&mut registry, config, secrets)?;
    register_openai(&mut registry, config, secrets)?;
    register_google(&mut registry, config, secrets)?;

    log::info!(
        "Registered providers: {}",
        registry.ids().map(|id| id.as_str()).collect::<Vec<_>>().join(", ")
    );
    Ok(registry)
}

#[cfg(feature = "groq")]
fn register_groq(
    registry: &mut ProviderRegistry,
    config: &AppConfig,
    secrets: &Secrets,
) -> Result<(), ConfigError> {
    let p = &config.providers.groq;
    let Some(key) = usable_key(p, &secrets.groq, "GROQ_API_KEY") else {
        return Ok(());
    };
    let groq = crate::backends::groq::Groq::new(
        key,
        p.base_url.clone(),
        p.model.clone(),
        p.max_tokens,
        p.temperature,
        p.timeout_seconds,
    )?;
    let id = groq.model().to_string();
    registry.insert(id, display_name(p, "Groq"), Arc::new(groq))?;
    Ok(())
}

#[cfg(not(feature = "groq"))]
fn register_groq(
    _registry: &mut ProviderRegistry,
    _config: &AppConfig,
    _secrets: &Secrets,
) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(feature = "openai")]
fn register_openai(
    registry: &mut ProviderRegistry,
    config: &AppConfig,
    secrets: &Secrets,
) -> Result<(), ConfigError> {
    let p = &config.providers.openai;
    let Some(key) = usable_key(p, &secrets.openai, "OPENAI_API_KEY") else {
        return Ok(());
    };
    let openai = crate::backends::openai::OpenAI::new(
        key,
        p.base_url.clone(),
        p.model.clone(),
        p.max_tokens,
        p.temperature,
        p.timeout_seconds,
    )?;
    let id = openai.model().to_string();
    registry.insert(id, display_name(p, "OpenAI"), Arc::new(openai))?;
    Ok(())
}

#[cfg(not(feature = "openai"))]
fn register_openai(
    _registry: &mut ProviderRegistry,
    _config: &AppConfig,
    _secrets: &Secrets,
) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(feature = "google")]
fn register_google(
    registry: &mut ProviderRegistry,
    config: &AppConfig,
    secrets: &Secrets,
) -> Result<(), ConfigError> {
    let p = &config.providers.google;
    let Some(key) = usable_key(p, &secrets.gemini, "GEMINI_API_KEY") else {
        return Ok(());
    };
    let google = crate::backends::google::Google::new(
        key,
        p.base_url.clone(),
        p.model.clone(),
        p.max_tokens,
        p.temperature,
        p.timeout_seconds,
    )?;
    let id = google.model().to_string();
    registry.insert(id, display_name(p, "Gemini"), Arc::new(google))?;
    Ok(())
}

#[cfg(not(feature = "google"))]
fn register_google(
    _registry: &mut ProviderRegistry,
    _config: &AppConfig,
    _secrets: &Secrets,
) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(any(feature = "groq", feature = "openai", feature = "google"))]
fn usable_key(
    provider: &ProviderConfig,
    key: &Option<SecretString>,
    var: &str,
) -> Option<String> {
    if !provider.enabled {
        return None;
    }
    match key {
        Some(key) => Some(key.expose_secret().to_string()),
        None => {
            log::warn!("{var} is not set; provider disabled");
            None
        }
    }
}

#[cfg(any(feature = "groq", feature = "openai", feature = "google"))]
fn display_name(provider: &ProviderConfig, fallback: &str) -> String {
    provider
        .display_name
        .clone()
        .unwrap_or_else(|| fallback.to_string())
}

/// Assembles a ready-to-serve pipeline from configuration.
pub fn build_pipeline(config: &AppConfig, secrets: &Secrets) -> Result<Pipeline, ConfigError> {
    let registry = Arc::new(build_registry(config, secrets)?);
    if registry.is_empty() {
        return Err(ConfigError::Invalid(
            "no provider is enabled with an API key".to_string(),
        ));
    }

    let store: Arc<dyn MetricsStore> = match &config.storage.metrics_file {
        Some(path) => Arc::new(JsonlMetricsStore::open(path)?),
        None => Arc::new(InMemoryMetricsStore::new()),
    };
    let metrics = MetricsSink::new(store, registry.clone());

    let judge = build_judge(config, secrets)?;
    let mut pipeline = Pipeline::new(registry, judge, metrics).with_fanout(FanOut::new(
        Duration::from_secs(config.pipeline.deadline_seconds),
    ));
    if let Some(augmenter) = build_augmenter(config, secrets)? {
        pipeline = pipeline.with_augmenter(augmenter);
    }
    Ok(pipeline)
}

#[cfg(feature = "openai")]
fn build_judge(config: &AppConfig, secrets: &Secrets) -> Result<Arc<dyn Judge>, ConfigError> {
    use crate::backends::openai::OpenAI;
    use crate::chat::ResponseFormat;
    use crate::evaluator::LlmJudge;
    use crate::resilient::ResilientChat;

    let key = secrets
        .openai
        .as_ref()
        .ok_or(ConfigError::MissingSecret("OPENAI_API_KEY"))?;
    let model = OpenAI::new(
        key.expose_secret().to_string(),
        config.judge.base_url.clone(),
        Some(config.judge.model.clone()),
        None,
        None,
        config.judge.timeout_seconds,
    )?
    .with_response_format(ResponseFormat::JsonObject);
    let resilient = ResilientChat::new(Arc::new(model), config.judge.retry.clone());
    Ok(Arc::new(LlmJudge::new(Arc::new(resilient))))
}

#[cfg(not(feature = "openai"))]
fn build_judge(_config: &AppConfig, _secrets: &Secrets) -> Result<Arc<dyn Judge>, ConfigError> {
    Err(ConfigError::Invalid(
        "the judge needs the `openai` feature".to_string(),
    ))
}

#[cfg(feature = "openai")]
fn build_augmenter(
    config: &AppConfig,
    secrets: &Secrets,
) -> Result<Option<crate::retrieval::ContextAugmenter>, ConfigError> {
    use crate::backends::openai::OpenAI;
    use crate::retrieval::{ContextAugmenter, InMemoryVectorIndex, PineconeIndex, VectorIndex};

    use super::types::IndexBackend;

    let Some(key) = secrets.openai.as_ref() else {
        log::warn!("OPENAI_API_KEY is not set; document mode disabled");
        return Ok(None);
    };
    let retrieval = &config.retrieval;
    let embedder = OpenAI::new(
        key.expose_secret().to_string(),
        config.providers.openai.base_url.clone(),
        None,
        None,
        None,
        retrieval.timeout_seconds,
    )?
    .with_embedding_model(retrieval.embedding_model.clone(), None);

    let index: Arc<dyn VectorIndex> = match retrieval.backend {
        IndexBackend::Memory => Arc::new(InMemoryVectorIndex::new()),
        IndexBackend::Pinecone => {
            let host = retrieval.pinecone_host.as_deref().ok_or_else(|| {
                ConfigError::Invalid("retrieval.pinecone_host is required for pinecone".to_string())
            })?;
            let api_key = secrets
                .pinecone
                .as_ref()
                .ok_or(ConfigError::MissingSecret("PINECONE_API_KEY"))?;
            Arc::new(PineconeIndex::new(
                api_key.expose_secret().to_string(),
                host,
                retrieval.namespace.clone(),
                retrieval.timeout_seconds,
            )?)
        }
    };
    Ok(Some(ContextAugmenter::new(Arc::new(embedder), index)))
}

#[cfg(not(feature = "openai"))]
fn build_augmenter(
    _config: &AppConfig,
    _secrets: &Secrets,
) -> Result<Option<crate::retrieval::ContextAugmenter>, ConfigError> {
    Ok(None)
}

#[cfg(all(test, feature = "full"))]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::parse_config;

    fn secrets(vars: &[(&str, &str)]) -> Secrets {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Secrets::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn registers_only_providers_with_keys() {
        let config = AppConfig::default();
        let registry =
            build_registry(&config, &secrets(&[("OPENAI_API_KEY", "sk"), ("GEMINI_API_KEY", "g")])).unwrap();

        let ids: Vec<&str> = registry.ids().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["gpt-3.5-turbo", "gemini-1.5-flash"]);
        assert_eq!(registry.provider_name("gemini-1.5-flash"), "Gemini");
    }

    #[test]
    fn disabled_and_renamed_providers() {
        let config = parse_config(
            r#"
[providers.openai]
enabled = false

[providers.groq]
model = "llama3-70b-8192"
display_name = "Groq Cloud"
"#,
        )
        .unwrap();
        let registry = build_registry(
            &config,
            &secrets(&[("OPENAI_API_KEY", "sk"), ("GROQ_API_KEY", "gq")]),
        )
        .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.provider_name("llama3-70b-8192"), "Groq Cloud");
    }

    #[tokio::test]
    async fn pipeline_requires_openai_key_for_judge() {
        let config = AppConfig::default();
        let err = build_pipeline(&config, &secrets(&[("GROQ_API_KEY", "gq")])).err().unwrap();
        assert!(matches!(err, ConfigError::MissingSecret("OPENAI_API_KEY")));
    }

    #[tokio::test]
    async fn pinecone_backend_needs_host() {
        let config = parse_config("[retrieval]\nbackend = \"pinecone\"\n").unwrap();
        let err = build_pipeline(&config, &secrets(&[("OPENAI_API_KEY", "sk"), ("PINECONE_API_KEY", "pc")]))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("pinecone_host")));
    }

    #[tokio::test]
    async fn default_pipeline_builds_with_openai_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = parse_config(&format!(
            "[storage]\nmetrics_file = {:?}\n",
            dir.path().join("metrics.jsonl")
        ))
        .unwrap();
        let pipeline = build_pipeline(&config, &secrets(&[("OPENAI_API_KEY", "sk")])).unwrap();
        assert_eq!(pipeline.registry().len(), 1);
        assert!(pipeline.augmenter().is_some());
    }
}
