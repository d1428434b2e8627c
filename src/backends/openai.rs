//! OpenAI API client implementation using the OpenAI-compatible base
//!
//! This module provides chat streaming, JSON-mode chat for judging, and
//! embeddings through OpenAI's API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    chat::{ChatMessage, ChatProvider, ChatResponse, ResponseFormat, TextStream},
    embedding::EmbeddingProvider,
    error::LLMError,
};

use super::ensure_success_response;
use super::openai_compatible::{OpenAICompatibleProvider, OpenAIProviderConfig};

/// OpenAI configuration for the generic provider
pub struct OpenAIConfig;

impl OpenAIProviderConfig for OpenAIConfig {
    const PROVIDER_NAME: &'static str = "OpenAI";
    const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1/";
    const DEFAULT_MODEL: &'static str = "gpt-3.5-turbo";
    const SUPPORTS_RESPONSE_FORMAT: bool = true;
}

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

// NOTE: OpenAI cannot directly use the OpenAICompatibleProvider type alias, as it needs embedding fields

/// Client for OpenAI API
pub struct OpenAI {
    provider: OpenAICompatibleProvider<OpenAIConfig>,
    pub embedding_model: String,
    pub embedding_dimensions: Option<u32>,
}

impl OpenAI {
    /// Creates a new OpenAI client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - OpenAI API key
    /// * `base_url` - API root, defaults to `https://api.openai.com/v1/`
    /// * `model` - Chat model, defaults to `gpt-3.5-turbo`
    /// * `max_tokens` - Maximum tokens to generate
    /// * `temperature` - Sampling temperature
    /// * `timeout_seconds` - Request timeout in seconds
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        model: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        timeout_seconds: Option<u64>,
    ) -> Result<Self, LLMError> {
        Ok(OpenAI {
            provider: OpenAICompatibleProvider::new(
                api_key,
                base_url,
                model,
                max_tokens,
                temperature,
                timeout_seconds,
            )?,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: None,
        })
    }

    /// Sets the model used by [`EmbeddingProvider::embed`].
    pub fn with_embedding_model(mut self, model: impl Into<String>, dimensions: Option<u32>) -> Self {
        self.embedding_model = model.into();
        self.embedding_dimensions = dimensions;
        self
    }

    /// Constrains non-streaming chat replies, e.g. to a JSON object for judging.
    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.provider = self.provider.with_response_format(format);
        self
    }

    pub fn api_key(&self) -> &str {
        &self.provider.config.api_key
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn base_url(&self) -> &reqwest::Url {
        self.provider.base_url()
    }
}

#[derive(Serialize)]
struct OpenAIEmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct OpenAIEmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize, Debug)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[async_trait]
impl ChatProvider for OpenAI {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
        self.provider.chat(messages).await
    }

    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<TextStream, LLMError> {
        self.provider.chat_stream(messages).await
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAI {
    async fn embed(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>, LLMError> {
        let body = OpenAIEmbeddingRequest {
            model: &self.embedding_model,
            input,
            dimensions: self.embedding_dimensions,
        };

        let resp = self
            .provider
            .client
            .post(self.provider.endpoint("embeddings")?)
            .bearer_auth(&self.provider.config.api_key)
            .json(&body)
            .send()
            .await?;
        let resp = ensure_success_response(resp, "OpenAI embeddings").await?;

        let mut json_resp: OpenAIEmbeddingResponse = resp.json().await?;
        json_resp.data.sort_by_key(|d| d.index);
        Ok(json_resp.data.into_iter().map(|d| d.embedding).collect())
    }
}
