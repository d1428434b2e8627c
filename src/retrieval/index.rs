use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LLMError;

/// One stored vector with its string metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// A query hit. `text` comes from the record's `text` metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMatch {
    pub id: String,
    pub score: f32,
    pub text: String,
}

/// Similarity search over stored document embeddings.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Returns at most `top_k` matches ordered by descending score.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<DocumentMatch>, LLMError>;

    /// Inserts or replaces a record with the same id.
    async fn upsert(&self, record: VectorRecord) -> Result<(), LLMError>;
}
