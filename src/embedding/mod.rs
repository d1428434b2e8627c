use async_trait::async_trait;

use crate::error::LLMError;

/// Trait for providers that turn text into dense vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds each input string; the output keeps the input order.
    async fn embed(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>, LLMError>;

    /// Embeds a single string.
    async fn embed_one(&self, input: &str) -> Result<Vec<f32>, LLMError> {
        self.embed(vec![input.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::ProviderError("embedding response was empty".to_string()))
    }
}
