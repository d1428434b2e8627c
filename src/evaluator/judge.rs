use std::sync::Arc;

use async_trait::async_trait;

use crate::chat::{ChatMessage, ChatProvider};

use super::error::EvaluationError;
use super::prompt::judge_instructions;
use super::scores::{parse_scores, EvaluationScores};

/// Model used for judging when none is configured.
pub const DEFAULT_JUDGE_MODEL: &str = "gpt-4-turbo-preview";

/// One response together with the request it answered.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
    pub expected_output: &'a str,
    pub response: &'a str,
}

/// Scores a candidate response against the expected output.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn evaluate(&self, candidate: &Candidate<'_>) -> Result<EvaluationScores, EvaluationError>;
}

/// Judge backed by a chat model replying with a JSON object.
///
/// The wrapped provider should be configured for JSON output
/// (e.g. [`crate::chat::ResponseFormat::JsonObject`]); fenced replies are
/// tolerated either way.
pub struct LlmJudge {
    provider: Arc<dyn ChatProvider>,
}

impl LlmJudge {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Judge for LlmJudge {
    async fn evaluate(&self, candidate: &Candidate<'_>) -> Result<EvaluationScores, EvaluationError> {
        let messages = ChatMessage::exchange(judge_instructions(candidate), candidate.response);
        let reply = self.provider.chat(&messages).await?;
        let content = reply.text().ok_or(EvaluationError::EmptyResponse)?;
        log::trace!("Judge reply: {content}");
        parse_scores(&content)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::chat::{ChatResponse, ChatRole};
    use crate::error::LLMError;
    use crate::test_support::TextReply;

    struct RecordingJudgeModel {
        reply: Result<Option<String>, String>,
        seen: Mutex<Vec<ChatMessage>>,
    }

    #[derive(Debug)]
    struct Blank;

    impl std::fmt::Display for Blank {
        fn fmt(&self, _f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            Ok(())
        }
    }

    impl ChatResponse for Blank {
        fn text(&self) -> Option<String> {
            None
        }
    }

    #[async_trait]
    impl ChatProvider for RecordingJudgeModel {
        async fn chat(
            &self,
            messages: &[ChatMessage],
        ) -> Result<Box<dyn ChatResponse>, LLMError> {
            self.seen.lock().unwrap().extend_from_slice(messages);
            match &self.reply {
                Ok(Some(text)) => Ok(Box::new(TextReply(text.clone()))),
                Ok(None) => Ok(Box::new(Blank)),
                Err(msg) => Err(LLMError::ProviderError(msg.clone())),
            }
        }
    }

    fn candidate() -> Candidate<'static> {
        Candidate {
            system_prompt: "You are concise.",
            user_prompt: "2+2?",
            expected_output: "4",
            response: "4",
        }
    }

    fn judge(reply: Result<Option<String>, String>) -> (LlmJudge, Arc<RecordingJudgeModel>) {
        let model = Arc::new(RecordingJudgeModel {
            reply,
            seen: Mutex::new(Vec::new()),
        });
        (LlmJudge::new(model.clone()), model)
    }

    #[tokio::test]
    async fn sends_instructions_then_response() {
        let reply = r#"{"relevanceScore":1,"accuracyScore":1,"clarityScore":1,"coherenceScore":1,
            "creativityScore":0.5,"alignmentScore":1,"hallucinationScore":0,"evaluationScore":0.9}"#;
        let (judge, model) = judge(Ok(Some(reply.to_string())));

        let scores = judge.evaluate(&candidate()).await.unwrap();
        assert_eq!(scores.evaluation_score, 0.9);

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].role, ChatRole::System);
        assert!(seen[0].content.contains("Expected Output: 4"));
        assert_eq!(seen[1].role, ChatRole::User);
        assert_eq!(seen[1].content, "4");
    }

    #[tokio::test]
    async fn missing_content_is_an_error() {
        let (judge, _) = judge(Ok(None));
        let err = judge.evaluate(&candidate()).await.unwrap_err();
        assert!(matches!(err, EvaluationError::EmptyResponse));
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let (judge, _) = judge(Err("overloaded".to_string()));
        let err = judge.evaluate(&candidate()).await.unwrap_err();
        assert!(matches!(err, EvaluationError::Provider(LLMError::ProviderError(_))));
    }
}
