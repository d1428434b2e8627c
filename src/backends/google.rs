//! Google Gemini API client.
//!
//! Gemini streams `GenerateContentResponse` objects over SSE rather than
//! OpenAI-style deltas, and takes the system prompt as a separate
//! `systemInstruction` field.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::{
    chat::{create_sse_stream, event_data, ChatMessage, ChatProvider, ChatResponse, ChatRole, TextStream},
    error::LLMError,
};

use super::{build_http_client, ensure_success_response, normalize_base_url};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Configuration for the Gemini client.
#[derive(Debug)]
pub struct GoogleConfig {
    pub api_key: String,
    pub base_url: Url,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

/// Client for interacting with Google's Gemini API.
pub struct Google {
    pub config: GoogleConfig,
    pub client: Client,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GoogleRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GoogleContent<'a>>,
    contents: Vec<GoogleContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GoogleGenerationConfig>,
}

#[derive(Serialize, Debug)]
struct GoogleContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<GooglePart<'a>>,
}

#[derive(Serialize, Debug)]
struct GooglePart<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GoogleGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize, Debug, Default)]
pub struct GoogleResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
    #[serde(default)]
    error: Option<GoogleError>,
}

#[derive(Deserialize, Debug)]
struct GoogleCandidate {
    #[serde(default)]
    content: Option<GoogleResponseContent>,
}

#[derive(Deserialize, Debug)]
struct GoogleResponseContent {
    #[serde(default)]
    parts: Vec<GoogleResponsePart>,
}

#[derive(Deserialize, Debug)]
struct GoogleResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GoogleError {
    message: String,
}

impl GoogleResponse {
    fn joined_text(&self) -> String {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

impl std::fmt::Display for GoogleResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.joined_text())
    }
}

impl ChatResponse for GoogleResponse {
    fn text(&self) -> Option<String> {
        let text = self.joined_text();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl Google {
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
            return Err(LLMError::AuthError("Missing Google API key".to_string()));
        }
        Ok(Self {
            config: GoogleConfig {
                api_key,
                base_url: normalize_base_url(base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?,
                model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                max_tokens,
                temperature,
                timeout_seconds,
            },
            client: build_http_client(timeout_seconds)?,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn method_url(&self, method: &str, sse: bool) -> Result<Url, LLMError> {
        let suffix = if sse { "?alt=sse" } else { "" };
        let raw = format!(
            "{}models/{}:{method}{suffix}",
            self.config.base_url, self.config.model
        );
        Url::parse(&raw).map_err(|e| LLMError::HttpError(e.to_string()))
    }

    fn build_request<'a>(&self, messages: &'a [ChatMessage]) -> GoogleRequest<'a> {
        let system: Vec<GooglePart<'a>> = messages
            .iter()
            .filter(|m| m.is_system())
            .map(|m| GooglePart { text: &m.content })
            .collect();
        let contents = messages
            .iter()
            .filter(|m| !m.is_system())
            .map(|m| GoogleContent {
                role: Some(match m.role {
                    ChatRole::Assistant => "model",
                    _ => "user",
                }),
                parts: vec![GooglePart { text: &m.content }],
            })
            .collect();
        let generation_config = if self.config.max_tokens.is_some() || self.config.temperature.is_some() {
            Some(GoogleGenerationConfig {
                max_output_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            })
        } else {
            None
        };

        GoogleRequest {
            system_instruction: if system.is_empty() {
                None
            } else {
                Some(GoogleContent {
                    role: None,
                    parts: system,
                })
            },
            contents,
            generation_config,
        }
    }

    async fn send(&self, url: Url, body: &GoogleRequest<'_>) -> Result<reqwest::Response, LLMError> {
        if log::log_enabled!(log::Level::Trace) {
            if let Ok(json) = serde_json::to_string(body) {
                log::trace!("Google request payload: {}", json);
            }
        }

        let mut request = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body);
        if let Some(timeout) = self.config.timeout_seconds {
            request = request.timeout(Duration::from_secs(timeout));
        }

        let response = request.send().await?;
        ensure_success_response(response, "Google").await
    }
}

#[async_trait]
impl ChatProvider for Google {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
        let body = self.build_request(messages);
        let response = self.send(self.method_url("generateContent", false)?, &body).await?;
        let raw = response.text().await?;
        let parsed: GoogleResponse =
            serde_json::from_str(&raw).map_err(|e| LLMError::ResponseFormatError {
                message: format!("Failed to decode Google response: {e}"),
                raw_response: raw,
            })?;
        Ok(Box::new(parsed))
    }

    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<TextStream, LLMError> {
        let body = self.build_request(messages);
        let response = self
            .send(self.method_url("streamGenerateContent", true)?, &body)
            .await?;
        Ok(create_sse_stream(response, parse_google_sse_chunk))
    }
}

/// Parses one SSE event of a Gemini `streamGenerateContent` response.
pub(crate) fn parse_google_sse_chunk(event: &str) -> Result<Option<String>, LLMError> {
    let Some(data) = event_data(event) else {
        return Ok(None);
    };
    if data.trim().is_empty() {
        return Ok(None);
    }
    let chunk: GoogleResponse = serde_json::from_str(&data)?;
    if let Some(err) = chunk.error {
        return Err(LLMError::ProviderError(err.message));
    }
    Ok(chunk.text())
}
