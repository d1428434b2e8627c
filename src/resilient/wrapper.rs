use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::{
    chat::{ChatMessage, ChatProvider, ChatResponse, TextStream},
    error::LLMError,
};

use super::config::ResilienceConfig;

/// Chat provider wrapper that retries transient failures using exponential backoff.
///
/// Streaming calls are retried only while the stream is being opened; once
/// fragments have been handed out, errors surface to the consumer unchanged.
pub struct ResilientChat {
    inner: Arc<dyn ChatProvider>,
    cfg: ResilienceConfig,
}

impl ResilientChat {
    pub fn new(inner: Arc<dyn ChatProvider>, cfg: ResilienceConfig) -> Self {
        Self { inner, cfg }
    }

    async fn retry<F, Fut, T>(&self, mut op: F) -> Result<T, LLMError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LLMError>>,
    {
        let max_attempts = self.cfg.max_attempts.max(1);
        let mut last_err: Option<LLMError> = None;

        for attempt in 0..max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if max_attempts == 1 || !Self::is_retryable(&err) => return Err(err),
                Err(err) => {
                    log::debug!("Attempt {} of {max_attempts} failed: {err}", attempt + 1);
                    last_err = Some(err);
                    if attempt + 1 < max_attempts {
                        self.backoff_sleep(attempt).await;
                    }
                }
            }
        }

        Err(LLMError::RetryExceeded {
            attempts: max_attempts,
            last_error: last_err.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    fn is_retryable(err: &LLMError) -> bool {
        match err {
            LLMError::HttpError(_) => true,
            LLMError::ProviderError(_) => true,
            LLMError::IndexError(_) => false,
            LLMError::ResponseFormatError { .. } => true,
            LLMError::JsonError(_) => true,
            LLMError::Generic(_) => true,
            LLMError::RetryExceeded { .. } => false,
            LLMError::AuthError(_) => false,
            LLMError::InvalidRequest(_) => false,
        }
    }

    async fn backoff_sleep(&self, attempt_index: usize) {
        let mut delay = self
            .cfg
            .base_delay_ms
            .saturating_mul(1u64 << attempt_index.min(16));
        delay = delay.min(self.cfg.max_delay_ms);
        if self.cfg.jitter {
            let span = (delay / 2).max(1);
            let jitter = ((attempt_index as u64)
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1))
                % span;
            delay = delay.saturating_sub(jitter);
        }
        sleep(Duration::from_millis(delay)).await;
    }
}

#[async_trait]
impl ChatProvider for ResilientChat {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
        self.retry(|| self.inner.chat(messages)).await
    }

    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<TextStream, LLMError> {
        self.retry(|| self.inner.chat_stream(messages)).await
    }
}
