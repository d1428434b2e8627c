use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::Stream;

use crate::error::LLMError;

use super::message::ChatMessage;

/// Finite, non-restartable sequence of text fragments produced by a backend.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LLMError>> + Send>>;

pub trait ChatResponse: std::fmt::Debug + std::fmt::Display + Send + Sync {
    fn text(&self) -> Option<String>;
}

/// Trait for providers that support chat-style interactions.
///
/// Every backend normalizes its native streaming shape to a [`TextStream`] of
/// plain text deltas; empty deltas are never yielded.
#[async_trait]
pub trait ChatProvider: Sync + Send {
    /// Sends a non-streaming chat request.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError>;

    /// Streams the response to a chat request as text fragments.
    async fn chat_stream(&self, _messages: &[ChatMessage]) -> Result<TextStream, LLMError> {
        Err(LLMError::Generic(
            "Streaming not supported for this provider".to_string(),
        ))
    }
}
