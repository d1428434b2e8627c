use std::collections::BTreeMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::embedding::EmbeddingProvider;
use crate::error::LLMError;

use super::index::{DocumentMatch, VectorIndex, VectorRecord};

/// Number of documents folded into an augmented prompt.
pub const TOP_K: usize = 5;

/// Suffix appended to every prompt that carries retrieved context.
pub const CONTEXT_INSTRUCTIONS: &str = "Please think step by step to provide an accurate response. \
If extra information is given by the llm that is in the context, let it be known in your response.";

/// Suffix appended when no document context is requested.
pub const STEP_BY_STEP: &str = "Please think step by step to provide an accurate response.";

/// Outcome of prompt augmentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Augmentation {
    /// Effective system prompt to send to providers
    Prompt(String),
    /// Document context was requested but the index had no match
    NoContext,
}

/// Descriptive metadata stored next to an ingested document.
#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    pub kind: String,
    pub filename: Option<String>,
}

/// Builds effective system prompts from an embedder and a vector index.
#[derive(Clone)]
pub struct ContextAugmenter {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl ContextAugmenter {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Returns the system prompt providers should see.
    ///
    /// Retrieval is only consulted when `use_document` is set.
    pub async fn augment(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        use_document: bool,
    ) -> Result<Augmentation, LLMError> {
        if !use_document {
            return Ok(Augmentation::Prompt(plain_prompt(system_prompt)));
        }

        let query = self.embedder.embed_one(user_prompt).await?;
        let matches = self.index.query(&query, TOP_K).await?;
        if matches.is_empty() {
            log::info!("No document matched the prompt; skipping fan-out");
            return Ok(Augmentation::NoContext);
        }
        log::debug!("Retrieved {} context document(s)", matches.len());

        Ok(Augmentation::Prompt(format!(
            "{system_prompt}\n\nPlease use the following context to inform your response:\n{}\n\n{CONTEXT_INSTRUCTIONS}",
            render_context(&matches)
        )))
    }

    /// Embeds `text` and stores it under a fresh UUID, which is returned.
    pub async fn ingest(&self, text: &str, metadata: DocumentMetadata) -> Result<String, LLMError> {
        if text.trim().is_empty() {
            return Err(LLMError::InvalidRequest(
                "Document contains no text".to_string(),
            ));
        }
        let id = Uuid::new_v4().to_string();
        let values = self.embedder.embed_one(text).await?;

        let mut stored = BTreeMap::from([
            ("id".to_string(), id.clone()),
            ("text".to_string(), text.to_string()),
            ("type".to_string(), metadata.kind),
        ]);
        if let Some(filename) = metadata.filename {
            stored.insert("filename".to_string(), filename);
        }

        self.index
            .upsert(VectorRecord {
                id: id.clone(),
                values,
                metadata: stored,
            })
            .await?;
        log::info!("Ingested document {id} ({} bytes)", text.len());
        Ok(id)
    }
}

/// System prompt used when no document context is requested.
pub fn plain_prompt(system_prompt: &str) -> String {
    format!("{system_prompt}\n\n{STEP_BY_STEP}")
}

fn render_context(matches: &[DocumentMatch]) -> String {
    matches
        .iter()
        .map(|m| format!("Document (score: {}): {}", m.score, m.text))
        .collect::<Vec<_>>()
        .join("\n")
}
