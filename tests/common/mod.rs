#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use llm_evaluator::api::Server;
use llm_evaluator::chat::{ChatMessage, ChatProvider, ChatResponse, TextStream};
use llm_evaluator::embedding::EmbeddingProvider;
use llm_evaluator::evaluator::{Candidate, EvaluationError, EvaluationScores, Judge};
use llm_evaluator::metrics::{InMemoryMetricsStore, MetricsSink};
use llm_evaluator::retrieval::{ContextAugmenter, InMemoryVectorIndex};
use llm_evaluator::{LLMError, Pipeline, ProviderRegistry};

#[derive(Debug)]
pub struct Reply(String);

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ChatResponse for Reply {
    fn text(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Streams canned fragments, or fails before producing any.
pub struct CannedProvider {
    fragments: Option<Vec<&'static str>>,
}

impl CannedProvider {
    pub fn answering(fragments: &[&'static str]) -> Self {
        Self {
            fragments: Some(fragments.to_vec()),
        }
    }

    pub fn failing() -> Self {
        Self { fragments: None }
    }
}

#[async_trait]
impl ChatProvider for CannedProvider {
    async fn chat(&self, _messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
        match &self.fragments {
            Some(parts) => Ok(Box::new(Reply(parts.concat()))),
            None => Err(LLMError::ProviderError("upstream unavailable".to_string())),
        }
    }

    async fn chat_stream(&self, _messages: &[ChatMessage]) -> Result<TextStream, LLMError> {
        let Some(parts) = self.fragments.clone() else {
            return Err(LLMError::ProviderError("upstream unavailable".to_string()));
        };
        Ok(Box::pin(stream::iter(parts).then(|part| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(part.to_string())
        })))
    }
}

/// Gives full marks to responses containing the expected output.
pub struct ContainsJudge;

#[async_trait]
impl Judge for ContainsJudge {
    async fn evaluate(&self, candidate: &Candidate<'_>) -> Result<EvaluationScores, EvaluationError> {
        let hit = if candidate.response.contains(candidate.expected_output) {
            1.0
        } else {
            0.0
        };
        Ok(EvaluationScores {
            relevance_score: hit,
            accuracy_score: hit,
            clarity_score: 1.0,
            coherence_score: 1.0,
            creativity_score: 0.5,
            alignment_score: hit,
            hallucination_score: 1.0 - hit,
            evaluation: "checked".to_string(),
            evaluation_score: hit,
            evaluation_feedback: String::new(),
            hallucination_feedback: "None".to_string(),
        })
    }
}

pub fn pipeline() -> Pipeline {
    let mut registry = ProviderRegistry::new();
    registry
        .insert("llama3-8b-8192", "Groq", Arc::new(CannedProvider::answering(&["2+2 ", "is ", "4"])))
        .unwrap();
    registry
        .insert("gpt-3.5-turbo", "OpenAI", Arc::new(CannedProvider::failing()))
        .unwrap();
    registry
        .insert("gemini-1.5-flash", "Gemini", Arc::new(CannedProvider::answering(&["Four."])))
        .unwrap();
    let registry = Arc::new(registry);
    let metrics = MetricsSink::new(Arc::new(InMemoryMetricsStore::new()), registry.clone());
    Pipeline::new(registry, Arc::new(ContainsJudge), metrics)
}

/// Counts ASCII letters, which is enough to rank short documents.
pub struct LetterEmbedder;

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    async fn embed(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>, LLMError> {
        Ok(input
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; 26];
                for c in text.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
                    v[(c - b'a') as usize] += 1.0;
                }
                v
            })
            .collect())
    }
}

/// Same providers as [`pipeline`], with retrieval over an empty in-memory index.
pub fn pipeline_with_retrieval() -> Pipeline {
    let augmenter = ContextAugmenter::new(Arc::new(LetterEmbedder), Arc::new(InMemoryVectorIndex::new()));
    pipeline().with_augmenter(augmenter)
}

pub async fn start_server(server: Server) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        server.serve(listener).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    addr
}
