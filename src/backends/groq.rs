//! Groq API client, served through the OpenAI-compatible wire format.

use super::openai_compatible::{OpenAICompatibleProvider, OpenAIProviderConfig};

/// Groq configuration for the generic provider
pub struct GroqConfig;

impl OpenAIProviderConfig for GroqConfig {
    const PROVIDER_NAME: &'static str = "Groq";
    const DEFAULT_BASE_URL: &'static str = "https://api.groq.com/openai/v1/";
    const DEFAULT_MODEL: &'static str = "mixtral-8x7b-32768";
    const SUPPORTS_RESPONSE_FORMAT: bool = true;
}

/// Client for the Groq API
pub type Groq = OpenAICompatibleProvider<GroqConfig>;
