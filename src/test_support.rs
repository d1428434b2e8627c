//! Scripted providers and judges shared by unit tests.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::{
    chat::{ChatMessage, ChatProvider, ChatResponse, TextStream},
    error::LLMError,
    evaluator::{Candidate, EvaluationError, EvaluationScores, Judge},
};

#[derive(Debug, Clone)]
pub(crate) enum Script {
    Fragments(Vec<String>),
    FailBeforeStream(String),
    FailAfter(Vec<String>, String),
    StallAfter(Vec<String>),
}

impl Script {
    pub(crate) fn fragments(parts: &[&str]) -> Self {
        Self::Fragments(parts.iter().map(|p| p.to_string()).collect())
    }

    pub(crate) fn fail_before_stream(message: &str) -> Self {
        Self::FailBeforeStream(message.to_string())
    }

    pub(crate) fn fail_after(parts: &[&str], message: &str) -> Self {
        Self::FailAfter(parts.iter().map(|p| p.to_string()).collect(), message.to_string())
    }

    pub(crate) fn stall_after(parts: &[&str]) -> Self {
        Self::StallAfter(parts.iter().map(|p| p.to_string()).collect())
    }
}

#[derive(Debug)]
pub(crate) struct TextReply(pub String);

impl std::fmt::Display for TextReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ChatResponse for TextReply {
    fn text(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Provider replaying a fixed script, one fragment per `delay`.
pub(crate) struct ScriptedProvider {
    script: Script,
    delay: Duration,
}

impl ScriptedProvider {
    pub(crate) fn new(script: Script) -> Self {
        Self {
            script,
            delay: Duration::from_millis(1),
        }
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn chat(&self, _messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
        match &self.script {
            Script::Fragments(parts) => Ok(Box::new(TextReply(parts.concat()))),
            Script::FailBeforeStream(msg) | Script::FailAfter(_, msg) => {
                Err(LLMError::ProviderError(msg.clone()))
            }
            Script::StallAfter(_) => futures::future::pending().await,
        }
    }

    async fn chat_stream(&self, _messages: &[ChatMessage]) -> Result<TextStream, LLMError> {
        let delay = self.delay;
        let paced = |parts: Vec<String>| {
            stream::iter(parts).then(move |part| async move {
                tokio::time::sleep(delay).await;
                Ok::<_, LLMError>(part)
            })
        };
        match self.script.clone() {
            Script::Fragments(parts) => Ok(Box::pin(paced(parts))),
            Script::FailBeforeStream(msg) => Err(LLMError::ProviderError(msg)),
            Script::FailAfter(parts, msg) => Ok(Box::pin(
                paced(parts).chain(stream::once(async move { Err(LLMError::ProviderError(msg)) })),
            )),
            Script::StallAfter(parts) => Ok(Box::pin(paced(parts).chain(stream::pending()))),
        }
    }
}

/// Judge returning the same verdict for every response, except `fail_on`.
#[derive(Default)]
pub(crate) struct FixedJudge {
    pub(crate) fail_on: Option<String>,
    pub(crate) seen: std::sync::Mutex<Vec<String>>,
}

impl FixedJudge {
    pub(crate) fn failing_on(response: &str) -> Self {
        Self {
            fail_on: Some(response.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn seen(&self) -> Vec<String> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

pub(crate) fn fixed_scores() -> EvaluationScores {
    EvaluationScores {
        relevance_score: 1.0,
        accuracy_score: 1.0,
        clarity_score: 0.9,
        coherence_score: 0.9,
        creativity_score: 0.4,
        alignment_score: 1.0,
        hallucination_score: 0.0,
        evaluation: "Matches the expected output.".to_string(),
        evaluation_score: 0.87,
        evaluation_feedback: "None needed.".to_string(),
        hallucination_feedback: "None".to_string(),
    }
}

#[async_trait]
impl Judge for FixedJudge {
    async fn evaluate(&self, candidate: &Candidate<'_>) -> Result<EvaluationScores, EvaluationError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(candidate.response.to_string());
        }
        if self.fail_on.as_deref() == Some(candidate.response) {
            return Err(EvaluationError::InvalidJson {
                message: "expected value at line 1 column 1".to_string(),
                raw: "not json".to_string(),
            });
        }
        Ok(fixed_scores())
    }
}
