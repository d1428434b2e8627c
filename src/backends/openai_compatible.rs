//! Generic client for backends speaking the OpenAI chat-completions wire format.
//!
//! Each backend supplies an [`OpenAIProviderConfig`] with its name, default
//! endpoint and model; request building, SSE decoding and error mapping are
//! shared.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::chat::{
    create_sse_stream, event_data, ChatMessage, ChatProvider, ChatResponse, ResponseFormat,
    TextStream,
};
use crate::error::LLMError;

use super::{build_http_client, ensure_success_response, normalize_base_url};

/// Static description of an OpenAI-compatible backend.
pub trait OpenAIProviderConfig: Send + Sync + 'static {
    const PROVIDER_NAME: &'static str;
    const DEFAULT_BASE_URL: &'static str;
    const DEFAULT_MODEL: &'static str;
    const SUPPORTS_RESPONSE_FORMAT: bool;
}

/// Runtime settings shared by every OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAICompatibleConfig {
    pub api_key: String,
    pub base_url: Url,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
    pub response_format: ResponseFormat,
}

/// Client for an OpenAI-compatible chat-completions API.
pub struct OpenAICompatibleProvider<C: OpenAIProviderConfig> {
    pub config: OpenAICompatibleConfig,
    pub client: Client,
    _marker: PhantomData<fn() -> C>,
}

#[derive(Serialize, Debug)]
pub struct OpenAIChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpenAIResponseFormat {
    JsonObject,
}

#[derive(Serialize, Debug)]
pub struct OpenAIChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<OpenAIChatMessage<'a>>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<OpenAIResponseFormat>,
}

#[derive(Deserialize, Debug)]
pub struct OpenAIChatResponse {
    pub choices: Vec<OpenAIChatChoice>,
}

#[derive(Deserialize, Debug)]
pub struct OpenAIChatChoice {
    pub message: OpenAIChatMsg,
}

#[derive(Deserialize, Debug)]
pub struct OpenAIChatMsg {
    #[serde(default)]
    pub content: Option<String>,
}

impl std::fmt::Display for OpenAIChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.text() {
            Some(text) => write!(f, "{text}"),
            None => write!(f, "No response content"),
        }
    }
}

impl ChatResponse for OpenAIChatResponse {
    fn text(&self) -> Option<String> {
        self.choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|content| !content.is_empty())
    }
}

#[derive(Deserialize, Debug)]
struct OpenAIStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
    #[serde(default)]
    error: Option<OpenAIStreamError>,
}

#[derive(Deserialize, Debug)]
struct OpenAIStreamChoice {
    delta: OpenAIStreamDelta,
}

#[derive(Deserialize, Debug)]
struct OpenAIStreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OpenAIStreamError {
    message: String,
}

impl<C: OpenAIProviderConfig> OpenAICompatibleProvider<C> {
    /// Creates a new client.
    ///
    /// `base_url` and `model` fall back to the backend defaults when `None`.
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        model: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        timeout_seconds: Option<u64>,
    ) -> Result<Self, LLMError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LLMError::AuthError(format!(
                "Missing {} API key",
                C::PROVIDER_NAME
            )));
        }
        let base_url = normalize_base_url(base_url.as_deref().unwrap_or(C::DEFAULT_BASE_URL))?;
        Ok(Self {
            config: OpenAICompatibleConfig {
                api_key,
                base_url,
                model: model.unwrap_or_else(|| C::DEFAULT_MODEL.to_string()),
                max_tokens,
                temperature,
                timeout_seconds,
                response_format: ResponseFormat::Text,
            },
            client: build_http_client(timeout_seconds)?,
            _marker: PhantomData,
        })
    }

    /// Constrains non-streaming replies to the given format.
    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.config.response_format = format;
        self
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, LLMError> {
        self.config
            .base_url
            .join(path)
            .map_err(|e| LLMError::HttpError(e.to_string()))
    }

    fn build_request<'a>(&'a self, messages: &'a [ChatMessage], stream: bool) -> OpenAIChatRequest<'a> {
        OpenAIChatRequest {
            model: &self.config.model,
            messages: messages
                .iter()
                .map(|m| OpenAIChatMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format: if stream {
                None
            } else {
                self.response_format()
            },
        }
    }

    fn response_format(&self) -> Option<OpenAIResponseFormat> {
        if !C::SUPPORTS_RESPONSE_FORMAT {
            return None;
        }
        match &self.config.response_format {
            ResponseFormat::Text => None,
            ResponseFormat::JsonObject => Some(OpenAIResponseFormat::JsonObject),
        }
    }

    async fn send(&self, body: &OpenAIChatRequest<'_>) -> Result<reqwest::Response, LLMError> {
        if log::log_enabled!(log::Level::Trace) {
            if let Ok(json) = serde_json::to_string(body) {
                log::trace!("{} request payload: {}", C::PROVIDER_NAME, json);
            }
        }

        let mut request = self
            .client
            .post(self.endpoint("chat/completions")?)
            .bearer_auth(&self.config.api_key)
            .json(body);
        if let Some(timeout) = self.config.timeout_seconds {
            request = request.timeout(Duration::from_secs(timeout));
        }

        let response = request.send().await?;
        ensure_success_response(response, C::PROVIDER_NAME).await
    }
}

#[async_trait]
impl<C: OpenAIProviderConfig> ChatProvider for OpenAICompatibleProvider<C> {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
        let body = self.build_request(messages, false);
        let response = self.send(&body).await?;
        let raw = response.text().await?;
        let parsed: OpenAIChatResponse =
            serde_json::from_str(&raw).map_err(|e| LLMError::ResponseFormatError {
                message: format!("Failed to decode {} response: {e}", C::PROVIDER_NAME),
                raw_response: raw,
            })?;
        Ok(Box::new(parsed))
    }

    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<TextStream, LLMError> {
        let body = self.build_request(messages, true);
        let response = self.send(&body).await?;
        Ok(create_sse_stream(response, parse_openai_sse_chunk))
    }
}

/// Parses one SSE event of an OpenAI-style completion stream.
pub(crate) fn parse_openai_sse_chunk(event: &str) -> Result<Option<String>, LLMError> {
    let Some(data) = event_data(event) else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }
    let chunk: OpenAIStreamChunk = serde_json::from_str(data)?;
    if let Some(err) = chunk.error {
        return Err(LLMError::ProviderError(err.message));
    }
    let text: String = chunk
        .choices
        .into_iter()
        .filter_map(|choice| choice.delta.content)
        .collect();
    Ok(if text.is_empty() { None } else { Some(text) })
}
